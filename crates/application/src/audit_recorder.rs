use std::sync::Arc;

use serde_json::Value;

use agora_core::AppResult;
use agora_domain::{AuditAction, TargetType};

use crate::{ActionContext, AuditEvent, AuditRepository};

/// One audit entry as described by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    action: AuditAction,
    target_type: Option<String>,
    target_id: Option<String>,
    before: Option<Value>,
    after: Option<Value>,
}

impl AuditRecord {
    /// Starts a record for an action on a typed target.
    #[must_use]
    pub fn new(action: AuditAction, target_type: TargetType) -> Self {
        Self::declared(action, Some(target_type.as_str().to_owned()))
    }

    /// Starts a record whose target type was declared by the caller.
    #[must_use]
    pub fn declared(action: AuditAction, target_type: Option<String>) -> Self {
        Self {
            action,
            target_type,
            target_id: None,
            before: None,
            after: None,
        }
    }

    /// Sets the target identifier.
    #[must_use]
    pub fn target_id(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    /// Sets an optional target identifier.
    #[must_use]
    pub fn maybe_target_id(mut self, target_id: Option<String>) -> Self {
        self.target_id = target_id;
        self
    }

    /// Sets the pre-mutation snapshot; `None` is stored as null.
    #[must_use]
    pub fn before(mut self, snapshot: Option<Value>) -> Self {
        self.before = snapshot;
        self
    }

    /// Sets the applied after-state.
    #[must_use]
    pub fn after(mut self, value: Value) -> Self {
        self.after = Some(value);
        self
    }

    /// Sets an optional after-state.
    #[must_use]
    pub fn maybe_after(mut self, value: Option<Value>) -> Self {
        self.after = value;
        self
    }
}

/// Appends audit entries on behalf of the acting admin.
#[derive(Clone)]
pub struct AuditRecorder {
    repository: Arc<dyn AuditRepository>,
}

impl AuditRecorder {
    /// Creates a recorder writing to an audit repository.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self { repository }
    }

    /// Persists one entry for an action that already took effect.
    ///
    /// Failures are returned to the caller; the mutation is not rolled back.
    pub async fn record(&self, context: &ActionContext, record: AuditRecord) -> AppResult<()> {
        let action = record.action.as_tag().into_owned();
        let event = AuditEvent {
            actor_id: context.actor_id(),
            actor_role: context.actor_role(),
            action,
            target_type: record.target_type,
            target_id: record.target_id,
            before_json: record.before,
            after_json: record.after,
            ip_address: context.metadata().ip_address.clone(),
            user_agent: context.metadata().user_agent.clone(),
        };
        let action = event.action.clone();
        let target_id = event.target_id.clone();

        self.repository.append_event(event).await.inspect_err(|error| {
            tracing::error!(
                error = %error,
                action = %action,
                target_id = ?target_id,
                actor = %context.actor_id(),
                "audit write failed after the action took effect"
            );
        })
    }
}
