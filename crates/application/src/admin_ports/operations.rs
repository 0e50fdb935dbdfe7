use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agora_core::{AppResult, NonEmptyString, PrincipalId};

/// Validated subscription plan row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPlan {
    /// Unique plan code.
    pub code: NonEmptyString,
    /// Display name.
    pub name: NonEmptyString,
    /// Optional description.
    pub description: Option<String>,
    /// Usage limits object.
    pub limits: Value,
    /// Feature flags object.
    pub features: Value,
    /// Whether the plan is offered.
    pub is_active: bool,
}

/// Partial plan update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanPatch {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description, an empty string clears it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replacement limits object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<Value>,
    /// Replacement features object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Value>,
    /// New active flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl PlanPatch {
    /// Returns whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Subscription plan store.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Lists plans, oldest first.
    async fn list_plans(&self) -> AppResult<Vec<Value>>;

    /// Reads the full plan row.
    async fn snapshot_plan(&self, code: &str) -> AppResult<Option<Value>>;

    /// Inserts a plan. Duplicate codes surface as store errors.
    async fn create_plan(&self, plan: NewPlan) -> AppResult<()>;

    /// Applies a patch. Fails with `NotFound` when the plan does not exist.
    async fn update_plan(&self, code: &str, patch: &PlanPatch) -> AppResult<()>;

    /// Deletes a plan. Fails with `NotFound` when the plan does not exist.
    async fn delete_plan(&self, code: &str) -> AppResult<()>;
}

/// One admin setting row to upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingEntry {
    /// Unique setting key.
    pub key: NonEmptyString,
    /// Setting value.
    pub value: Value,
}

/// Admin settings store.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Reads one setting value.
    async fn find_setting(&self, key: &str) -> AppResult<Option<Value>>;

    /// Lists rows whose key matches a SQL `LIKE` pattern.
    async fn list_settings(&self, pattern: &str) -> AppResult<Vec<Value>>;

    /// Upserts every entry keyed by `key` atomically.
    async fn upsert_settings(
        &self,
        entries: &[SettingEntry],
        updated_by: PrincipalId,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()>;
}

/// Object storage collaborator.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Lists objects under a prefix.
    async fn list_objects(&self, bucket: &str, prefix: &str, limit: u32) -> AppResult<Vec<Value>>;

    /// Removes every listed object in one call.
    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> AppResult<()>;
}
