use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use agora_core::{AppError, AppResult, NonEmptyString};
use agora_domain::{AdminRole, AuditAction, TargetType};

use crate::{
    ActionContext, ActionHandler, ActionPolicy, AdminAction, AuditLogRepository, AuditRecord,
    AuditRecorder, bounded_limit, ok_payload,
};

/// Audit trail actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum AuditLogAction {
    /// Most recent entries.
    List {
        /// Row limit, default 200, at most 1000.
        #[serde(default)]
        limit: Option<i64>,
    },
    /// Entries about one target.
    ListForTarget {
        /// Target kind.
        #[serde(default)]
        target_type: String,
        /// Target identifier.
        #[serde(default)]
        target_id: String,
        /// Row limit, default 200, at most 1000.
        #[serde(default)]
        limit: Option<i64>,
    },
    /// Append an entry declared by an admin client.
    Log {
        /// Action tag to store.
        #[serde(default)]
        action_name: String,
        /// Target kind.
        #[serde(default)]
        target_type: Option<String>,
        /// Target identifier.
        #[serde(default)]
        target_id: Option<String>,
        /// State before.
        #[serde(default)]
        before_json: Option<Value>,
        /// State after.
        #[serde(default)]
        after_json: Option<Value>,
    },
    /// Unrecognized tag.
    #[serde(other)]
    Unknown,
}

const AUDIT_LOG_POLICIES: &[ActionPolicy] = &[
    ActionPolicy::new("list", AdminRole::Support, TargetType::System),
    ActionPolicy::new("list-for-target", AdminRole::Support, TargetType::System),
    ActionPolicy::new("log", AdminRole::Support, TargetType::System),
];

impl AdminAction for AuditLogAction {
    fn policy(tag: &str) -> Option<ActionPolicy> {
        AUDIT_LOG_POLICIES.iter().find(|policy| policy.name == tag).copied()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Reads the audit trail and records client-declared events.
#[derive(Clone)]
pub struct AuditLogService {
    entries: Arc<dyn AuditLogRepository>,
    audit: AuditRecorder,
}

impl AuditLogService {
    /// Creates the service.
    #[must_use]
    pub fn new(entries: Arc<dyn AuditLogRepository>, audit: AuditRecorder) -> Self {
        Self { entries, audit }
    }
}

#[async_trait]
impl ActionHandler for AuditLogService {
    const AREA: &'static str = "audit";
    type Action = AuditLogAction;

    async fn handle(&self, context: &ActionContext, action: AuditLogAction) -> AppResult<Value> {
        match action {
            AuditLogAction::List { limit } => {
                let entries = self
                    .entries
                    .list_recent(bounded_limit(limit, 200, 1000))
                    .await?;
                encode(&entries)
            }
            AuditLogAction::ListForTarget {
                target_type,
                target_id,
                limit,
            } => {
                let target_type = NonEmptyString::required("targetType", target_type)?;
                let target_id = NonEmptyString::required("targetId", target_id)?;
                let entries = self
                    .entries
                    .list_for_target(
                        target_type.as_str(),
                        target_id.as_str(),
                        bounded_limit(limit, 200, 1000),
                    )
                    .await?;
                encode(&entries)
            }
            AuditLogAction::Log {
                action_name,
                target_type,
                target_id,
                before_json,
                after_json,
            } => {
                let action_name = NonEmptyString::required("actionName", action_name)?;
                self.audit
                    .record(
                        context,
                        AuditRecord::declared(AuditAction::Custom(action_name), non_blank(target_type))
                            .maybe_target_id(non_blank(target_id))
                            .before(before_json)
                            .maybe_after(after_json),
                    )
                    .await?;
                Ok(ok_payload())
            }
            AuditLogAction::Unknown => Err(AppError::Validation("unknown action".to_owned())),
        }
    }
}

fn encode<T: serde::Serialize>(entries: &T) -> AppResult<Value> {
    serde_json::to_value(entries)
        .map_err(|error| AppError::Internal(format!("failed to encode audit entries: {error}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{Value, json};
    use tokio::sync::Mutex;

    use agora_core::{AppError, AppResult, PrincipalId};
    use agora_domain::AdminRole;

    use super::{AuditLogAction, AuditLogService};
    use crate::test_support::{RecordingAuditRepository, context_for};
    use crate::{ActionHandler, AuditLogEntry, AuditLogRepository, AuditRecorder};

    #[derive(Default)]
    struct FakeAuditLogRepository {
        limits: Mutex<Vec<i64>>,
    }

    fn entry(target_id: &str) -> AuditLogEntry {
        AuditLogEntry {
            id: format!("a-{target_id}"),
            actor_user_id: PrincipalId::new(),
            actor_role: AdminRole::Moderator,
            action: "lock-user".to_owned(),
            target_type: Some("user".to_owned()),
            target_id: Some(target_id.to_owned()),
            before_json: None,
            after_json: Some(json!({ "locked_until": null })),
            ip_address: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    #[async_trait]
    impl AuditLogRepository for FakeAuditLogRepository {
        async fn list_recent(&self, limit: i64) -> AppResult<Vec<AuditLogEntry>> {
            self.limits.lock().await.push(limit);
            Ok(vec![entry("u-1"), entry("u-2")])
        }

        async fn list_for_target(
            &self,
            _target_type: &str,
            target_id: &str,
            limit: i64,
        ) -> AppResult<Vec<AuditLogEntry>> {
            self.limits.lock().await.push(limit);
            Ok(vec![entry(target_id)])
        }
    }

    fn service() -> (
        AuditLogService,
        Arc<FakeAuditLogRepository>,
        Arc<RecordingAuditRepository>,
    ) {
        let entries = Arc::new(FakeAuditLogRepository::default());
        let audit = Arc::new(RecordingAuditRepository::default());
        (
            AuditLogService::new(entries.clone(), AuditRecorder::new(audit.clone())),
            entries,
            audit,
        )
    }

    #[tokio::test]
    async fn list_limit_is_clamped_to_one_thousand() {
        let (service, entries, _audit) = service();
        let context = context_for(AdminRole::Support);

        let listed = service
            .handle(&context, AuditLogAction::List { limit: Some(50_000) })
            .await;
        assert!(matches!(listed, Ok(Value::Array(ref rows)) if rows.len() == 2));
        let defaulted = service
            .handle(&context, AuditLogAction::List { limit: None })
            .await;
        assert!(defaulted.is_ok());

        assert_eq!(*entries.limits.lock().await, vec![1000, 200]);
    }

    #[tokio::test]
    async fn list_for_target_requires_both_keys() {
        let (service, _entries, _audit) = service();

        let result = service
            .handle(
                &context_for(AdminRole::Support),
                AuditLogAction::ListForTarget {
                    target_type: "user".to_owned(),
                    target_id: " ".to_owned(),
                    limit: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn client_declared_event_is_stored_verbatim() {
        let (service, _entries, audit) = service();

        let result = service
            .handle(
                &context_for(AdminRole::Support),
                AuditLogAction::Log {
                    action_name: "report_warn_user".to_owned(),
                    target_type: Some("user".to_owned()),
                    target_id: Some("u-5".to_owned()),
                    before_json: None,
                    after_json: Some(json!({ "note": "first warning" })),
                },
            )
            .await;
        assert!(matches!(result, Ok(value) if value == json!({ "ok": true })));

        let events = audit.events.lock().await;
        assert_eq!(events[0].action, "report_warn_user");
        assert_eq!(events[0].actor_role, AdminRole::Support);
        assert_eq!(events[0].target_id.as_deref(), Some("u-5"));
        assert_eq!(events[0].ip_address.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn log_requires_action_name() {
        let (service, _entries, audit) = service();

        let result = service
            .handle(
                &context_for(AdminRole::Support),
                AuditLogAction::Log {
                    action_name: String::new(),
                    target_type: None,
                    target_id: None,
                    before_json: None,
                    after_json: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(audit.events.lock().await.is_empty());
    }
}
