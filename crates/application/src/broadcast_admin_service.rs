use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use agora_core::{AppError, AppResult, NonEmptyString};
use agora_domain::{AdminRole, AuditAction, BroadcastAudience, BroadcastStatus, TargetType};

use crate::{
    ActionContext, ActionHandler, ActionPolicy, AdminAction, AuditRecord, AuditRecorder,
    BroadcastRepository, NewBroadcast, bounded_limit,
};

/// Broadcast notification actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum BroadcastAction {
    /// List broadcasts, newest first.
    List {
        /// Row limit, default 50.
        #[serde(default)]
        limit: Option<i64>,
    },
    /// Create a broadcast, sending it at once unless scheduled.
    Create {
        /// Notification title.
        #[serde(default)]
        title: String,
        /// Notification body.
        #[serde(default)]
        body: String,
        /// `all`, `class` or `user`.
        #[serde(default)]
        target_type: String,
        /// Class or member id.
        #[serde(default)]
        target_id: Option<String>,
        /// Future delivery time.
        #[serde(default)]
        scheduled_at: Option<DateTime<Utc>>,
    },
    /// Deliver a scheduled broadcast now.
    Send {
        /// Broadcast id.
        #[serde(default)]
        broadcast_id: String,
    },
    /// Unrecognized tag.
    #[serde(other)]
    Unknown,
}

const BROADCAST_POLICIES: &[ActionPolicy] = &[
    ActionPolicy::new("list", AdminRole::SuperAdmin, TargetType::Broadcast),
    ActionPolicy::new("create", AdminRole::SuperAdmin, TargetType::Broadcast),
    ActionPolicy::new("send", AdminRole::SuperAdmin, TargetType::Broadcast),
];

impl AdminAction for BroadcastAction {
    fn policy(tag: &str) -> Option<ActionPolicy> {
        BROADCAST_POLICIES.iter().find(|policy| policy.name == tag).copied()
    }
}

/// Application service for broadcast notifications.
#[derive(Clone)]
pub struct BroadcastAdminService {
    broadcasts: Arc<dyn BroadcastRepository>,
    audit: AuditRecorder,
}

impl BroadcastAdminService {
    /// Creates the service.
    #[must_use]
    pub fn new(broadcasts: Arc<dyn BroadcastRepository>, audit: AuditRecorder) -> Self {
        Self { broadcasts, audit }
    }

    async fn create(
        &self,
        context: &ActionContext,
        title: String,
        body: String,
        target_type: String,
        target_id: Option<String>,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> AppResult<Value> {
        let title = NonEmptyString::required("title", title)?;
        let body = NonEmptyString::required("body", body)?;
        let target_id = target_id.filter(|value| !value.trim().is_empty());
        let audience = BroadcastAudience::parse(target_type.trim(), target_id.as_deref())?;

        let recipient_count = self.broadcasts.count_recipients(&audience).await?;
        let now = Utc::now();
        let status = if scheduled_at.is_some() {
            BroadcastStatus::Scheduled
        } else {
            BroadcastStatus::Sent
        };

        let record = self
            .broadcasts
            .create_broadcast(NewBroadcast {
                title: title.clone(),
                body,
                audience: audience.clone(),
                status,
                scheduled_at,
                sent_at: (status == BroadcastStatus::Sent).then_some(now),
                created_by: context.actor_id(),
                recipient_count,
            })
            .await?;

        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::BroadcastCreated, TargetType::Broadcast)
                    .target_id(record.id.clone())
                    .after(json!({
                        "title": title.as_str(),
                        "target_type": audience.target_type(),
                        "recipient_count": recipient_count,
                    })),
            )
            .await?;

        encode_record(&record)
    }

    async fn send(&self, context: &ActionContext, broadcast_id: String) -> AppResult<Value> {
        let broadcast_id = NonEmptyString::required("broadcastId", broadcast_id)?;
        let Some(record) = self
            .broadcasts
            .find_broadcast(broadcast_id.as_str())
            .await?
        else {
            return Err(AppError::NotFound(format!(
                "broadcast '{broadcast_id}' not found"
            )));
        };
        if record.status == BroadcastStatus::Sent {
            return Err(AppError::Validation("broadcast already sent".to_owned()));
        }

        let audience =
            BroadcastAudience::parse(record.target_type.as_str(), record.target_id.as_deref())?;
        let recipient_count = self.broadcasts.count_recipients(&audience).await?;
        let sent = self
            .broadcasts
            .send_scheduled(record.id.as_str(), &audience, Utc::now(), recipient_count)
            .await?;

        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::BroadcastSent, TargetType::Broadcast)
                    .target_id(sent.id.clone())
                    .before(Some(encode_record(&record)?))
                    .after(json!({ "recipient_count": recipient_count })),
            )
            .await?;

        encode_record(&sent)
    }
}

fn encode_record<T: serde::Serialize>(record: &T) -> AppResult<Value> {
    serde_json::to_value(record)
        .map_err(|error| AppError::Internal(format!("failed to encode broadcast: {error}")))
}

#[async_trait]
impl ActionHandler for BroadcastAdminService {
    const AREA: &'static str = "broadcasts";
    type Action = BroadcastAction;

    async fn handle(&self, context: &ActionContext, action: BroadcastAction) -> AppResult<Value> {
        match action {
            BroadcastAction::List { limit } => {
                let broadcasts = self
                    .broadcasts
                    .list_broadcasts(bounded_limit(limit, 50, 500))
                    .await?;
                encode_record(&broadcasts)
            }
            BroadcastAction::Create {
                title,
                body,
                target_type,
                target_id,
                scheduled_at,
            } => {
                self.create(context, title, body, target_type, target_id, scheduled_at)
                    .await
            }
            BroadcastAction::Send { broadcast_id } => self.send(context, broadcast_id).await,
            BroadcastAction::Unknown => Err(AppError::Validation("unknown action".to_owned())),
        }
    }
}
