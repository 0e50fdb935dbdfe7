use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use agora_core::{AppResult, NonEmptyString, PrincipalId};
use agora_domain::{BroadcastAudience, BroadcastStatus};

/// Broadcast to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBroadcast {
    /// Notification title.
    pub title: NonEmptyString,
    /// Notification body.
    pub body: NonEmptyString,
    /// Recipients.
    pub audience: BroadcastAudience,
    /// Initial status.
    pub status: BroadcastStatus,
    /// Planned delivery time.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Delivery time when sent immediately.
    pub sent_at: Option<DateTime<Utc>>,
    /// Creating admin.
    pub created_by: PrincipalId,
    /// Recipient count at creation.
    pub recipient_count: i64,
}

/// Stored broadcast row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastRecord {
    /// Row identifier.
    pub id: String,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// `all`, `class` or `user`.
    pub target_type: String,
    /// Class or member id.
    pub target_id: Option<String>,
    /// Delivery state.
    pub status: BroadcastStatus,
    /// Planned delivery time.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Delivery time.
    pub sent_at: Option<DateTime<Utc>>,
    /// Creating admin.
    pub created_by: PrincipalId,
    /// Recipient count.
    pub recipient_count: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Broadcast store and notification fan-out.
#[async_trait]
pub trait BroadcastRepository: Send + Sync {
    /// Lists broadcasts, newest first.
    async fn list_broadcasts(&self, limit: i64) -> AppResult<Vec<BroadcastRecord>>;

    /// Counts members reached by an audience.
    async fn count_recipients(&self, audience: &BroadcastAudience) -> AppResult<i64>;

    /// Inserts a broadcast and returns the stored row.
    ///
    /// A broadcast inserted as sent gets its notifications in the same
    /// transaction, so either both land or neither does.
    async fn create_broadcast(&self, broadcast: NewBroadcast) -> AppResult<BroadcastRecord>;

    /// Reads one broadcast.
    async fn find_broadcast(&self, broadcast_id: &str) -> AppResult<Option<BroadcastRecord>>;

    /// Marks a scheduled broadcast sent and creates its notifications atomically.
    ///
    /// Fails with `Validation` when the broadcast is no longer scheduled and
    /// `NotFound` when it does not exist.
    async fn send_scheduled(
        &self,
        broadcast_id: &str,
        audience: &BroadcastAudience,
        sent_at: DateTime<Utc>,
        recipient_count: i64,
    ) -> AppResult<BroadcastRecord>;
}

/// Private message store, read-only.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Lists conversations with participants, last message and count, most recently active first.
    async fn list_conversations(&self, limit: i64, query: Option<&str>) -> AppResult<Vec<Value>>;

    /// Lists messages of one conversation with sender summaries, oldest first.
    async fn list_messages(&self, conversation_id: &str, limit: i64) -> AppResult<Vec<Value>>;
}

/// Headline platform counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    /// Registered profiles.
    pub total_users: i64,
    /// Profiles active since midnight UTC.
    pub dau: i64,
    /// Profiles active in the last 30 days.
    pub mau: i64,
    /// Posts created since midnight UTC.
    pub posts_today: i64,
    /// All posts.
    pub total_posts: i64,
    /// Messages sent since midnight UTC.
    pub messages_today: i64,
}

/// Read-only platform analytics.
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    /// Computes headline counters.
    async fn platform_stats(&self) -> AppResult<PlatformStats>;

    /// Lists the most engaging recent posts.
    async fn top_content(&self, limit: i64) -> AppResult<Vec<Value>>;

    /// Lists members with the most followers.
    async fn top_users(&self, limit: i64) -> AppResult<Vec<Value>>;
}
