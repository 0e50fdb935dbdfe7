use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use agora_core::{AppError, AppResult, NonEmptyString};
use agora_domain::{
    AdminRole, AuditAction, MODERATION_POSTS_SETTING_KEY, ModerationPostSettings,
    TRENDING_SETTING_KEY, TargetType, TrendingMultiplier, TrendingWeights,
};

use crate::{
    ActionContext, ActionHandler, ActionPolicy, AdminAction, AuditRecord, AuditRecorder,
    PostListQuery, PostRemoval, PostRepository, PostRestoration, PostStatusFilter,
    SettingsRepository, TrendingOverride, bounded_limit, ok_payload,
};

/// Post moderation actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum PostAction {
    /// List posts for review.
    List {
        /// Row limit, `1..=500`, default 50.
        #[serde(default)]
        limit: Option<i64>,
        /// Removal state filter, default active.
        #[serde(default)]
        status: Option<PostStatusFilter>,
        /// Search text.
        #[serde(default)]
        query: Option<String>,
    },
    /// List trending posts.
    Trending {
        /// Row limit, `1..=100`, default 10.
        #[serde(default)]
        limit: Option<i64>,
    },
    /// Soft-delete a post.
    Remove {
        /// Post id.
        post_id: String,
        /// Removal reason.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Undo a removal.
    Restore {
        /// Post id.
        post_id: String,
    },
    /// Upsert the trending override of a post.
    SetTrending {
        /// Post id.
        post_id: String,
        /// Multiplier in `(0, 10]`.
        multiplier: f64,
        /// Hide from trending.
        #[serde(default)]
        exclude_from_trending: bool,
        /// Operator note.
        #[serde(default)]
        note: Option<String>,
    },
    /// Unrecognized tag.
    #[serde(other)]
    Unknown,
}

const POST_POLICIES: &[ActionPolicy] = &[
    ActionPolicy::new("list", AdminRole::Support, TargetType::Post),
    ActionPolicy::new("trending", AdminRole::Support, TargetType::Post),
    ActionPolicy::new("remove", AdminRole::Moderator, TargetType::Post),
    ActionPolicy::new("restore", AdminRole::Moderator, TargetType::Post),
    ActionPolicy::new("set-trending", AdminRole::SuperAdmin, TargetType::Post),
];

impl AdminAction for PostAction {
    fn policy(tag: &str) -> Option<ActionPolicy> {
        POST_POLICIES.iter().find(|policy| policy.name == tag).copied()
    }
}

/// Application service for post moderation.
#[derive(Clone)]
pub struct PostAdminService {
    posts: Arc<dyn PostRepository>,
    settings: Arc<dyn SettingsRepository>,
    audit: AuditRecorder,
}

impl PostAdminService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        posts: Arc<dyn PostRepository>,
        settings: Arc<dyn SettingsRepository>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            posts,
            settings,
            audit,
        }
    }

    async fn moderation_policy(&self) -> AppResult<ModerationPostSettings> {
        let value = self.settings.find_setting(MODERATION_POSTS_SETTING_KEY).await?;
        Ok(ModerationPostSettings::from_setting_value(value.as_ref()))
    }

    async fn remove(
        &self,
        context: &ActionContext,
        post_id: String,
        reason: Option<String>,
    ) -> AppResult<Value> {
        let post_id = NonEmptyString::required("postId", post_id)?;
        let reason = self
            .moderation_policy()
            .await?
            .resolve_removal_reason(reason.as_deref())?;
        let removed_at = Utc::now();

        let before = self.posts.snapshot_post(post_id.as_str()).await?;
        self.posts
            .remove_post(PostRemoval {
                post_id: post_id.clone(),
                reason: reason.clone(),
                removed_by: context.actor_id(),
                removed_at,
            })
            .await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::RemovePost, TargetType::Post)
                    .target_id(post_id)
                    .before(before)
                    .after(json!({ "deleted_at": removed_at, "reason": reason })),
            )
            .await?;

        Ok(ok_payload())
    }

    async fn restore(&self, context: &ActionContext, post_id: String) -> AppResult<Value> {
        let post_id = NonEmptyString::required("postId", post_id)?;
        if !self.moderation_policy().await?.allow_restore_post {
            return Err(AppError::Forbidden(
                "restoring removed posts is disabled".to_owned(),
            ));
        }

        let before = self.posts.snapshot_post(post_id.as_str()).await?;
        self.posts
            .restore_post(PostRestoration {
                post_id: post_id.clone(),
                restored_by: context.actor_id(),
                restored_at: Utc::now(),
            })
            .await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::RestorePost, TargetType::Post)
                    .target_id(post_id)
                    .before(before)
                    .after(json!({ "deleted_at": null })),
            )
            .await?;

        Ok(ok_payload())
    }

    async fn set_trending(
        &self,
        context: &ActionContext,
        post_id: String,
        multiplier: f64,
        exclude_from_trending: bool,
        note: Option<String>,
    ) -> AppResult<Value> {
        let post_id = NonEmptyString::required("postId", post_id)?;
        let override_row = TrendingOverride {
            post_id: post_id.clone(),
            trending_multiplier: TrendingMultiplier::new(multiplier)?,
            exclude_from_trending,
            note: note
                .map(|note| note.trim().to_owned())
                .filter(|note| !note.is_empty()),
            updated_by: context.actor_id(),
            updated_at: Utc::now(),
        };
        let after = serde_json::to_value(&override_row)
            .map_err(|error| AppError::Internal(format!("failed to encode override: {error}")))?;

        let before = self
            .posts
            .snapshot_trending_override(post_id.as_str())
            .await?;
        self.posts.upsert_trending_override(override_row).await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::SetPostTrending, TargetType::Post)
                    .target_id(post_id)
                    .before(before)
                    .after(after),
            )
            .await?;

        Ok(ok_payload())
    }
}

#[async_trait]
impl ActionHandler for PostAdminService {
    const AREA: &'static str = "posts";
    type Action = PostAction;

    async fn handle(&self, context: &ActionContext, action: PostAction) -> AppResult<Value> {
        match action {
            PostAction::List {
                limit,
                status,
                query,
            } => {
                let posts = self
                    .posts
                    .list_posts(PostListQuery {
                        limit: bounded_limit(limit, 50, 500),
                        status: status.unwrap_or_default(),
                        query: query
                            .map(|query| query.trim().to_owned())
                            .filter(|query| !query.is_empty()),
                    })
                    .await?;
                Ok(Value::from(posts))
            }
            PostAction::Trending { limit } => {
                let weights = self.settings.find_setting(TRENDING_SETTING_KEY).await?;
                let posts = self
                    .posts
                    .list_trending(
                        bounded_limit(limit, 10, 100),
                        &TrendingWeights::from_setting_value(weights.as_ref()),
                    )
                    .await?;
                Ok(Value::from(posts))
            }
            PostAction::Remove { post_id, reason } => self.remove(context, post_id, reason).await,
            PostAction::Restore { post_id } => self.restore(context, post_id).await,
            PostAction::SetTrending {
                post_id,
                multiplier,
                exclude_from_trending,
                note,
            } => {
                self.set_trending(context, post_id, multiplier, exclude_from_trending, note)
                    .await
            }
            PostAction::Unknown => Err(AppError::Validation("unknown action".to_owned())),
        }
    }
}

#[cfg(test)]
mod tests;
