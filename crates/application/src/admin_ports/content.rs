use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agora_core::{AppResult, NonEmptyString, PrincipalId};
use agora_domain::{
    BoostMultiplier, ProfileEdits, ReportActionTaken, ReportStatus, TrendingMultiplier,
    TrendingWeights, VerificationType,
};

/// Verification columns written by `set-verification`.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationUpdate {
    /// Badge kind.
    pub verified_type: VerificationType,
    /// Grant time, cleared for `none`.
    pub verified_at: Option<DateTime<Utc>>,
    /// Granting admin, cleared for `none`.
    pub verified_by: Option<PrincipalId>,
    /// Expiry, `None` when permanent or cleared.
    pub verified_expires_at: Option<DateTime<Utc>>,
}

/// Lock columns written by `lock-user`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileLock {
    /// Reason shown to the member.
    pub reason: NonEmptyString,
    /// Lock time.
    pub locked_at: DateTime<Utc>,
    /// Expiry, `None` when permanent.
    pub locked_until: Option<DateTime<Utc>>,
    /// Locking admin.
    pub locked_by: PrincipalId,
}

/// Boost columns written by `set-boost`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserBoost {
    /// Validated reach multiplier.
    pub multiplier: BoostMultiplier,
    /// Expiry, `None` when permanent.
    pub expires_at: Option<DateTime<Utc>>,
    /// Boosting admin.
    pub boosted_by: PrincipalId,
}

/// Member profile store.
///
/// Mutations fail with `NotFound` when the profile does not exist.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Reads the full profile row.
    async fn snapshot_profile(&self, user_id: PrincipalId) -> AppResult<Option<Value>>;

    /// Writes verification columns.
    async fn set_verification(
        &self,
        user_id: PrincipalId,
        update: VerificationUpdate,
    ) -> AppResult<()>;

    /// Locks the account.
    async fn lock_profile(&self, user_id: PrincipalId, lock: ProfileLock) -> AppResult<()>;

    /// Clears every lock column.
    async fn unlock_profile(&self, user_id: PrincipalId) -> AppResult<()>;

    /// Writes boost columns.
    async fn set_boost(&self, user_id: PrincipalId, boost: UserBoost) -> AppResult<()>;

    /// Applies whitelisted column edits.
    async fn apply_profile_edits(&self, user_id: PrincipalId, edits: &ProfileEdits)
    -> AppResult<()>;
}

/// Post list filter on removal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatusFilter {
    /// Not removed.
    #[default]
    Active,
    /// Soft-deleted.
    Removed,
    /// Both.
    All,
}

/// Post listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostListQuery {
    /// Maximum rows.
    pub limit: i64,
    /// Removal state filter.
    pub status: PostStatusFilter,
    /// Case-insensitive match on body or author handle.
    pub query: Option<String>,
}

/// Soft delete plus moderation record.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRemoval {
    /// Post identifier.
    pub post_id: NonEmptyString,
    /// Resolved removal reason.
    pub reason: NonEmptyString,
    /// Removing admin.
    pub removed_by: PrincipalId,
    /// Removal time, also written as the post's deleted timestamp.
    pub removed_at: DateTime<Utc>,
}

/// Restore plus moderation record.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRestoration {
    /// Post identifier.
    pub post_id: NonEmptyString,
    /// Restoring admin.
    pub restored_by: PrincipalId,
    /// Restore time.
    pub restored_at: DateTime<Utc>,
}

/// Trending override row, keyed by post id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingOverride {
    /// Post identifier.
    pub post_id: NonEmptyString,
    /// Validated multiplier.
    pub trending_multiplier: TrendingMultiplier,
    /// Hide from trending entirely.
    pub exclude_from_trending: bool,
    /// Operator note.
    pub note: Option<String>,
    /// Updating admin.
    pub updated_by: PrincipalId,
    /// Update time.
    pub updated_at: DateTime<Utc>,
}

/// Post store.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Lists posts for moderation, newest first.
    async fn list_posts(&self, query: PostListQuery) -> AppResult<Vec<Value>>;

    /// Lists public posts ranked by `weights`, best first, each with a `trend_score`.
    async fn list_trending(&self, limit: i64, weights: &TrendingWeights) -> AppResult<Vec<Value>>;

    /// Reads the full post row.
    async fn snapshot_post(&self, post_id: &str) -> AppResult<Option<Value>>;

    /// Sets the deleted timestamp and upserts the moderation record, clearing restore fields.
    ///
    /// Fails with `NotFound` when the post does not exist.
    async fn remove_post(&self, removal: PostRemoval) -> AppResult<()>;

    /// Clears the deleted timestamp and upserts restore fields.
    ///
    /// Fails with `NotFound` when the post does not exist.
    async fn restore_post(&self, restoration: PostRestoration) -> AppResult<()>;

    /// Reads the current override row.
    async fn snapshot_trending_override(&self, post_id: &str) -> AppResult<Option<Value>>;

    /// Creates or replaces the override keyed by post id.
    async fn upsert_trending_override(&self, override_row: TrendingOverride) -> AppResult<()>;
}

/// Review columns written to a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportReview {
    /// New status.
    pub status: ReportStatus,
    /// Reviewing admin.
    pub reviewed_by: PrincipalId,
    /// Review time.
    pub reviewed_at: DateTime<Utc>,
    /// Notes, left untouched when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
    /// Outcome, left untouched when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_taken: Option<ReportActionTaken>,
}

/// User report store.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Lists reports with reporter and reviewer summaries, newest first.
    async fn list_reports(&self, status: Option<ReportStatus>, limit: i64)
    -> AppResult<Vec<Value>>;

    /// Reads the full report row.
    async fn snapshot_report(&self, report_id: &str) -> AppResult<Option<Value>>;

    /// Writes review columns. Fails with `NotFound` when the report does not exist.
    async fn review_report(&self, report_id: &str, review: ReportReview) -> AppResult<()>;
}
