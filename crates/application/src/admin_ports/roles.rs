use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use agora_core::{AppResult, PrincipalId};
use agora_domain::{AdminRole, AdminRoleAssignment};

/// Single-column change to an existing assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAssignmentPatch {
    /// Replace the role.
    Role(AdminRole),
    /// Activate or deactivate.
    Active(bool),
    /// Toggle the DM access flag.
    DmAccess(bool),
}

/// Assignment joined with the member's profile summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminListing {
    /// Assignment row.
    #[serde(flatten)]
    pub assignment: AdminRoleAssignment,
    /// `id, handle, full_name, avatar_url` of the member, when a profile exists.
    pub profiles: Option<Value>,
}

/// Role store port.
#[async_trait]
pub trait AdminRoleRepository: Send + Sync {
    /// Finds the assignment of a principal.
    ///
    /// `Ok(None)` means no assignment exists; store failures are errors, never `None`.
    async fn find_assignment(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Option<AdminRoleAssignment>>;

    /// Lists all assignments, oldest first.
    async fn list_assignments(&self) -> AppResult<Vec<AdminListing>>;

    /// Creates or replaces the assignment keyed by its principal id.
    async fn upsert_assignment(&self, assignment: AdminRoleAssignment) -> AppResult<()>;

    /// Applies a patch to an existing assignment. Fails with `NotFound` if absent.
    async fn update_assignment(
        &self,
        principal_id: PrincipalId,
        patch: AdminAssignmentPatch,
    ) -> AppResult<()>;

    /// Reads the profile summary shown next to an assignment.
    async fn find_profile_summary(&self, principal_id: PrincipalId) -> AppResult<Option<Value>>;
}
