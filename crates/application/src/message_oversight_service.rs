use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use agora_core::{AppError, AppResult, NonEmptyString};
use agora_domain::{AdminRole, AuditAction, TargetType};

use crate::{
    ActionContext, ActionHandler, ActionPolicy, AdminAction, AuditRecord, AuditRecorder,
    MessageRepository, bounded_limit,
};

/// Private message oversight actions. Every read is audited.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum MessageAction {
    /// List conversations.
    ListConversations {
        /// Row limit, default 50.
        #[serde(default)]
        limit: Option<i64>,
        /// Participant handle or name filter.
        #[serde(default)]
        query: Option<String>,
    },
    /// Read the messages of one conversation.
    GetMessages {
        /// Conversation id.
        #[serde(default)]
        conversation_id: String,
        /// Row limit, default 100.
        #[serde(default)]
        limit: Option<i64>,
    },
    /// Unrecognized tag.
    #[serde(other)]
    Unknown,
}

const MESSAGE_POLICIES: &[ActionPolicy] = &[
    ActionPolicy::new("list-conversations", AdminRole::SuperAdmin, TargetType::System),
    ActionPolicy::new("get-messages", AdminRole::SuperAdmin, TargetType::Conversation),
];

impl AdminAction for MessageAction {
    fn policy(tag: &str) -> Option<ActionPolicy> {
        MESSAGE_POLICIES.iter().find(|policy| policy.name == tag).copied()
    }
}

/// Read-only access to private messages for super admins.
#[derive(Clone)]
pub struct MessageOversightService {
    messages: Arc<dyn MessageRepository>,
    audit: AuditRecorder,
}

impl MessageOversightService {
    /// Creates the service.
    #[must_use]
    pub fn new(messages: Arc<dyn MessageRepository>, audit: AuditRecorder) -> Self {
        Self { messages, audit }
    }
}

#[async_trait]
impl ActionHandler for MessageOversightService {
    const AREA: &'static str = "messages";
    type Action = MessageAction;

    async fn handle(&self, context: &ActionContext, action: MessageAction) -> AppResult<Value> {
        // Checked again here so a looser area policy can never expose messages.
        if context.actor_role() != AdminRole::SuperAdmin {
            return Err(AppError::Forbidden("super admin access required".to_owned()));
        }

        match action {
            MessageAction::ListConversations { limit, query } => {
                let query = query.filter(|value| !value.trim().is_empty());
                let conversations = self
                    .messages
                    .list_conversations(bounded_limit(limit, 50, 200), query.as_deref())
                    .await?;

                self.audit
                    .record(
                        context,
                        AuditRecord::new(AuditAction::DmListViewed, TargetType::System)
                            .after(json!({ "count": conversations.len() })),
                    )
                    .await?;
                Ok(Value::from(conversations))
            }
            MessageAction::GetMessages {
                conversation_id,
                limit,
            } => {
                let conversation_id = NonEmptyString::required("conversationId", conversation_id)?;
                let messages = self
                    .messages
                    .list_messages(conversation_id.as_str(), bounded_limit(limit, 100, 500))
                    .await?;

                self.audit
                    .record(
                        context,
                        AuditRecord::new(
                            AuditAction::DmConversationViewed,
                            TargetType::Conversation,
                        )
                        .target_id(conversation_id)
                        .after(json!({ "message_count": messages.len() })),
                    )
                    .await?;
                Ok(Value::from(messages))
            }
            MessageAction::Unknown => Err(AppError::Validation("unknown action".to_owned())),
        }
    }
}
