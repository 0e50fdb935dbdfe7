use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use agora_core::{AppError, AppResult, Principal, PrincipalId};
use agora_domain::{AdminRole, AdminRoleAssignment, TargetType};

use crate::{
    ActionContext, ActionPolicy, AdminAssignmentPatch, AdminListing, AdminRoleRepository,
    AuditEvent, AuditRepository, RequestMetadata,
};

pub(crate) fn assignment(principal_id: PrincipalId, role: AdminRole) -> AdminRoleAssignment {
    AdminRoleAssignment {
        principal_id,
        role,
        is_active: true,
        dm_access_enabled: false,
        created_by: None,
        created_at: None,
    }
}

pub(crate) fn context_for(role: AdminRole) -> ActionContext {
    let principal_id = PrincipalId::new();
    ActionContext::new(
        Principal::new(principal_id, Some("admin@example.com".to_owned())),
        assignment(principal_id, role),
        RequestMetadata {
            ip_address: Some("203.0.113.7".to_owned()),
            user_agent: Some("agora-tests".to_owned()),
        },
        ActionPolicy::new("test", role, TargetType::System),
    )
}

#[derive(Default)]
pub(crate) struct RecordingAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditRepository {
    pub(crate) async fn actions(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .map(|event| event.action.clone())
            .collect()
    }
}

#[async_trait]
impl AuditRepository for RecordingAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Rejects every append, as a database outage would after the mutation commits.
#[derive(Default)]
pub(crate) struct FailingAuditRepository;

#[async_trait]
impl AuditRepository for FailingAuditRepository {
    async fn append_event(&self, _event: AuditEvent) -> AppResult<()> {
        Err(AppError::Store("audit log unavailable".to_owned()))
    }
}

#[derive(Default)]
pub(crate) struct FakeAdminRoleRepository {
    pub(crate) assignments: Mutex<HashMap<PrincipalId, AdminRoleAssignment>>,
}

impl FakeAdminRoleRepository {
    pub(crate) fn with(assignments: Vec<AdminRoleAssignment>) -> Self {
        Self {
            assignments: Mutex::new(
                assignments
                    .into_iter()
                    .map(|value| (value.principal_id, value))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl AdminRoleRepository for FakeAdminRoleRepository {
    async fn find_assignment(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Option<AdminRoleAssignment>> {
        Ok(self.assignments.lock().await.get(&principal_id).cloned())
    }

    async fn list_assignments(&self) -> AppResult<Vec<AdminListing>> {
        let mut listings: Vec<AdminListing> = self
            .assignments
            .lock()
            .await
            .values()
            .cloned()
            .map(|assignment| AdminListing {
                assignment,
                profiles: None,
            })
            .collect();
        listings.sort_by_key(|listing| listing.assignment.created_at);
        Ok(listings)
    }

    async fn upsert_assignment(&self, mut assignment: AdminRoleAssignment) -> AppResult<()> {
        let mut assignments = self.assignments.lock().await;
        if let Some(existing) = assignments.get(&assignment.principal_id) {
            assignment.created_at = existing.created_at;
        }
        assignments.insert(assignment.principal_id, assignment);
        Ok(())
    }

    async fn update_assignment(
        &self,
        principal_id: PrincipalId,
        patch: AdminAssignmentPatch,
    ) -> AppResult<()> {
        let mut assignments = self.assignments.lock().await;
        let Some(assignment) = assignments.get_mut(&principal_id) else {
            return Err(AppError::NotFound("admin user not found".to_owned()));
        };
        match patch {
            AdminAssignmentPatch::Role(role) => assignment.role = role,
            AdminAssignmentPatch::Active(is_active) => assignment.is_active = is_active,
            AdminAssignmentPatch::DmAccess(enabled) => assignment.dm_access_enabled = enabled,
        }
        Ok(())
    }

    async fn find_profile_summary(&self, _principal_id: PrincipalId) -> AppResult<Option<Value>> {
        Ok(None)
    }
}
