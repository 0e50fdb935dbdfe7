use std::sync::Arc;

use agora_core::{AppError, AppResult, PrincipalId};
use agora_domain::{AdminRole, AdminRoleAssignment};

use crate::AdminRoleRepository;

/// Authorization gate every privileged action passes through.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AdminRoleRepository>,
}

impl AuthorizationService {
    /// Creates a gate backed by the role store.
    #[must_use]
    pub fn new(repository: Arc<dyn AdminRoleRepository>) -> Self {
        Self { repository }
    }

    /// Ensures the principal holds an active assignment of at least `min_role`.
    ///
    /// Store failures propagate unchanged and are never reported as "not an admin".
    pub async fn require_role(
        &self,
        principal_id: PrincipalId,
        min_role: AdminRole,
    ) -> AppResult<AdminRoleAssignment> {
        let Some(assignment) = self.repository.find_assignment(principal_id).await? else {
            return Err(AppError::Forbidden("not an admin".to_owned()));
        };

        if !assignment.is_active {
            return Err(AppError::Forbidden("admin account is inactive".to_owned()));
        }

        if !assignment.role.has_role(min_role) {
            return Err(AppError::Forbidden("insufficient role".to_owned()));
        }

        Ok(assignment)
    }
}
