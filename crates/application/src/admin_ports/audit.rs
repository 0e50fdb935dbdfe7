use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use agora_core::{AppResult, PrincipalId};
use agora_domain::AdminRole;

/// Audit row written once per privileged action.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    /// Acting principal.
    pub actor_id: PrincipalId,
    /// Role of the actor at write time.
    pub actor_role: AdminRole,
    /// Stable action tag.
    pub action: String,
    /// Target kind, if any.
    pub target_type: Option<String>,
    /// Target identifier, if any.
    pub target_id: Option<String>,
    /// State before the action.
    pub before_json: Option<Value>,
    /// State after the action.
    pub after_json: Option<Value>,
    /// Caller IP address.
    pub ip_address: Option<String>,
    /// Caller user agent.
    pub user_agent: Option<String>,
}

/// Port for persisting append-only audit events.
///
/// Entries are never updated or deleted.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends a single audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}

/// Stored audit row as returned to operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogEntry {
    /// Row identifier.
    pub id: String,
    /// Acting principal.
    pub actor_user_id: PrincipalId,
    /// Role of the actor at write time.
    pub actor_role: AdminRole,
    /// Stable action tag.
    pub action: String,
    /// Target kind, if any.
    pub target_type: Option<String>,
    /// Target identifier, if any.
    pub target_id: Option<String>,
    /// State before the action.
    pub before_json: Option<Value>,
    /// State after the action.
    pub after_json: Option<Value>,
    /// Caller IP address.
    pub ip_address: Option<String>,
    /// Caller user agent.
    pub user_agent: Option<String>,
    /// Write timestamp.
    pub created_at: DateTime<Utc>,
}

/// Read side of the audit trail.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists the most recent entries, newest first.
    async fn list_recent(&self, limit: i64) -> AppResult<Vec<AuditLogEntry>>;

    /// Lists entries for one target, newest first.
    async fn list_for_target(
        &self,
        target_type: &str,
        target_id: &str,
        limit: i64,
    ) -> AppResult<Vec<AuditLogEntry>>;
}
