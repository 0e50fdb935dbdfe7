use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use agora_core::{AppError, AppResult, NonEmptyString};
use agora_domain::{AdminRole, AuditAction, TargetType};

use crate::{
    ActionContext, ActionHandler, ActionPolicy, AdminAction, AuditRecord, AuditRecorder,
    SettingEntry, SettingsRepository, ok_payload,
};

/// One submitted setting row.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingInput {
    /// Setting key.
    #[serde(default)]
    pub key: String,
    /// Setting value, stored as `{}` when absent or null.
    #[serde(default)]
    pub value: Value,
}

/// Admin settings actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SettingsAction {
    /// List settings by key pattern.
    List {
        /// SQL `LIKE` pattern.
        #[serde(default)]
        like: String,
    },
    /// Upsert settings in bulk.
    Upsert {
        /// Rows to write.
        #[serde(default)]
        settings: Vec<SettingInput>,
    },
    /// Unrecognized tag.
    #[serde(other)]
    Unknown,
}

const SETTINGS_POLICIES: &[ActionPolicy] = &[
    ActionPolicy::new("list", AdminRole::SuperAdmin, TargetType::AdminSettings),
    ActionPolicy::new("upsert", AdminRole::SuperAdmin, TargetType::AdminSettings),
];

impl AdminAction for SettingsAction {
    fn policy(tag: &str) -> Option<ActionPolicy> {
        SETTINGS_POLICIES.iter().find(|policy| policy.name == tag).copied()
    }
}

/// Application service for key-value admin settings.
#[derive(Clone)]
pub struct SettingsAdminService {
    settings: Arc<dyn SettingsRepository>,
    audit: AuditRecorder,
}

impl SettingsAdminService {
    /// Creates the service.
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsRepository>, audit: AuditRecorder) -> Self {
        Self { settings, audit }
    }

    async fn upsert(&self, context: &ActionContext, inputs: Vec<SettingInput>) -> AppResult<Value> {
        if inputs.is_empty() {
            return Err(AppError::Validation("settings is required".to_owned()));
        }

        let entries = inputs
            .into_iter()
            .map(|input| {
                Ok(SettingEntry {
                    key: NonEmptyString::required("setting key", input.key)?,
                    value: if input.value.is_null() {
                        json!({})
                    } else {
                        input.value
                    },
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        let keys: Vec<&str> = entries.iter().map(|entry| entry.key.as_str()).collect();
        let after = json!({ "keys": keys });

        self.settings
            .upsert_settings(&entries, context.actor_id(), Utc::now())
            .await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::UpdateSettings, TargetType::AdminSettings)
                    .target_id("bulk")
                    .after(after),
            )
            .await?;

        Ok(ok_payload())
    }
}

#[async_trait]
impl ActionHandler for SettingsAdminService {
    const AREA: &'static str = "settings";
    type Action = SettingsAction;

    async fn handle(&self, context: &ActionContext, action: SettingsAction) -> AppResult<Value> {
        match action {
            SettingsAction::List { like } => {
                let pattern = NonEmptyString::required("like", like)?;
                Ok(Value::from(
                    self.settings.list_settings(pattern.as_str()).await?,
                ))
            }
            SettingsAction::Upsert { settings } => self.upsert(context, settings).await,
            SettingsAction::Unknown => Err(AppError::Validation("unknown action".to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::{Value, json};
    use tokio::sync::Mutex;

    use agora_core::{AppError, AppResult, PrincipalId};
    use agora_domain::AdminRole;

    use super::{SettingsAction, SettingsAdminService};
    use crate::test_support::{RecordingAuditRepository, context_for};
    use crate::{ActionHandler, AuditRecorder, SettingEntry, SettingsRepository};

    #[derive(Default)]
    struct FakeSettingsRepository {
        rows: Mutex<BTreeMap<String, Value>>,
    }

    #[async_trait]
    impl SettingsRepository for FakeSettingsRepository {
        async fn find_setting(&self, key: &str) -> AppResult<Option<Value>> {
            Ok(self.rows.lock().await.get(key).cloned())
        }

        async fn list_settings(&self, pattern: &str) -> AppResult<Vec<Value>> {
            let prefix = pattern.trim_end_matches('%');
            Ok(self
                .rows
                .lock()
                .await
                .iter()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, value)| json!({ "key": key, "value": value }))
                .collect())
        }

        async fn upsert_settings(
            &self,
            entries: &[SettingEntry],
            _updated_by: PrincipalId,
            _updated_at: DateTime<Utc>,
        ) -> AppResult<()> {
            let mut rows = self.rows.lock().await;
            for entry in entries {
                rows.insert(entry.key.to_string(), entry.value.clone());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn upsert_writes_one_bulk_audit_entry() {
        let repository = Arc::new(FakeSettingsRepository::default());
        let audit = Arc::new(RecordingAuditRepository::default());
        let service = SettingsAdminService::new(repository.clone(), AuditRecorder::new(audit.clone()));

        let Ok(action) = serde_json::from_value::<SettingsAction>(json!({
            "action": "upsert",
            "settings": [
                { "key": "moderation.posts", "value": { "require_removal_reason": false } },
                { "key": "moderation.trending" },
            ],
        })) else {
            panic!("fixture action should parse");
        };
        let result = service.handle(&context_for(AdminRole::SuperAdmin), action).await;
        assert!(result.is_ok());

        assert_eq!(
            repository.rows.lock().await.get("moderation.trending"),
            Some(&json!({}))
        );
        let events = audit.events.lock().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].target_id.as_deref(), Some("bulk"));
        assert_eq!(
            events[0].after_json,
            Some(json!({ "keys": ["moderation.posts", "moderation.trending"] }))
        );
    }

    #[tokio::test]
    async fn empty_upsert_and_blank_pattern_are_rejected() {
        let service = SettingsAdminService::new(
            Arc::new(FakeSettingsRepository::default()),
            AuditRecorder::new(Arc::new(RecordingAuditRepository::default())),
        );
        let context = context_for(AdminRole::SuperAdmin);

        assert!(matches!(
            service
                .handle(&context, SettingsAction::Upsert { settings: Vec::new() })
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service
                .handle(&context, SettingsAction::List { like: " ".to_owned() })
                .await,
            Err(AppError::Validation(_))
        ));
    }
}
