use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use agora_core::{AppError, AppResult, Principal, PrincipalId};
use agora_domain::{AdminRole, AdminRoleAssignment, AuditAction, EmailAddress, TargetType};

use crate::{
    ActionContext, ActionHandler, ActionPolicy, AdminAction, AdminAssignmentPatch, AdminListing,
    AdminRoleRepository, AuditRecord, AuditRecorder, IdentityProvider, ok_payload,
};

/// Identity provider pages scanned when resolving an email.
pub const EMAIL_LOOKUP_MAX_PAGES: u32 = 25;

/// Principals requested per identity provider page.
pub const EMAIL_LOOKUP_PAGE_SIZE: u32 = 200;

/// Admin role management actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum AdminUserAction {
    /// List every assignment with profile summaries.
    List,
    /// Grant a role to the member owning an email address.
    AddAdmin {
        /// Member email.
        #[serde(default)]
        email: String,
        /// Role to grant.
        role: AdminRole,
    },
    /// Activate or deactivate an assignment.
    SetActive {
        /// Admin principal id.
        user_id: PrincipalId,
        /// New state.
        is_active: bool,
    },
    /// Toggle the DM access flag.
    SetDmAccess {
        /// Admin principal id.
        user_id: PrincipalId,
        /// New flag value.
        enabled: bool,
    },
    /// Change the role of an assignment.
    SetRole {
        /// Admin principal id.
        user_id: PrincipalId,
        /// New role.
        role: AdminRole,
    },
    /// Unrecognized tag.
    #[serde(other)]
    Unknown,
}

const ADMIN_USER_POLICIES: &[ActionPolicy] = &[
    ActionPolicy::new("list", AdminRole::SuperAdmin, TargetType::AdminUser),
    ActionPolicy::new("add-admin", AdminRole::SuperAdmin, TargetType::AdminUser),
    ActionPolicy::new("set-active", AdminRole::SuperAdmin, TargetType::AdminUser),
    ActionPolicy::new("set-dm-access", AdminRole::SuperAdmin, TargetType::AdminUser),
    ActionPolicy::new("set-role", AdminRole::SuperAdmin, TargetType::AdminUser),
];

impl AdminAction for AdminUserAction {
    fn policy(tag: &str) -> Option<ActionPolicy> {
        ADMIN_USER_POLICIES.iter().find(|policy| policy.name == tag).copied()
    }
}

/// Application service for administrative role assignments.
#[derive(Clone)]
pub struct AdminUserService {
    roles: Arc<dyn AdminRoleRepository>,
    identity: Arc<dyn IdentityProvider>,
    audit: AuditRecorder,
}

impl AdminUserService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        roles: Arc<dyn AdminRoleRepository>,
        identity: Arc<dyn IdentityProvider>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            roles,
            identity,
            audit,
        }
    }

    async fn find_principal_by_email(&self, email: &EmailAddress) -> AppResult<Principal> {
        for page in 1..=EMAIL_LOOKUP_MAX_PAGES {
            let principals = self
                .identity
                .list_principals(page, EMAIL_LOOKUP_PAGE_SIZE)
                .await?;
            let exhausted = principals.len() < EMAIL_LOOKUP_PAGE_SIZE as usize;

            if let Some(principal) = principals.into_iter().find(|principal| {
                principal
                    .email()
                    .is_some_and(|candidate| candidate.trim().eq_ignore_ascii_case(email.as_str()))
            }) {
                return Ok(principal);
            }
            if exhausted {
                break;
            }
        }

        Err(AppError::NotFound("user not found for that email".to_owned()))
    }

    async fn add_admin(
        &self,
        context: &ActionContext,
        email: String,
        role: AdminRole,
    ) -> AppResult<Value> {
        let email = EmailAddress::new(email)?;
        let principal = self.find_principal_by_email(&email).await?;
        let previous = self.roles.find_assignment(principal.id()).await?;

        let assignment = AdminRoleAssignment {
            principal_id: principal.id(),
            role,
            is_active: true,
            dm_access_enabled: false,
            created_by: Some(context.actor_id()),
            created_at: Some(Utc::now()),
        };
        self.roles.upsert_assignment(assignment).await?;
        let Some(assignment) = self.roles.find_assignment(principal.id()).await? else {
            return Err(AppError::Store(format!(
                "admin assignment for '{}' missing after upsert",
                principal.id()
            )));
        };

        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::AddAdmin, TargetType::AdminUser)
                    .target_id(principal.id().to_string())
                    .before(previous.as_ref().map(encode).transpose()?)
                    .after(json!({ "role": role.as_str() })),
            )
            .await?;

        tracing::info!(
            admin = %principal.id(),
            role = role.as_str(),
            granted_by = %context.actor_id(),
            "admin role granted"
        );

        let profiles = self.roles.find_profile_summary(principal.id()).await?;
        encode(&AdminListing {
            assignment,
            profiles,
        })
    }

    async fn patch(
        &self,
        context: &ActionContext,
        user_id: PrincipalId,
        patch: AdminAssignmentPatch,
    ) -> AppResult<Value> {
        let (action, after) = match patch {
            AdminAssignmentPatch::Active(is_active) => {
                (AuditAction::SetAdminActive, json!({ "is_active": is_active }))
            }
            AdminAssignmentPatch::DmAccess(enabled) => (
                AuditAction::SetAdminDmAccess,
                json!({ "dm_access_enabled": enabled }),
            ),
            AdminAssignmentPatch::Role(role) => {
                (AuditAction::SetAdminRole, json!({ "role": role.as_str() }))
            }
        };

        let before = self.roles.find_assignment(user_id).await?;
        self.roles.update_assignment(user_id, patch).await?;
        self.audit
            .record(
                context,
                AuditRecord::new(action, TargetType::AdminUser)
                    .target_id(user_id.to_string())
                    .before(before.as_ref().map(encode).transpose()?)
                    .after(after),
            )
            .await?;

        Ok(ok_payload())
    }
}

fn encode<T: serde::Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|error| AppError::Internal(format!("failed to encode admin user: {error}")))
}

#[async_trait]
impl ActionHandler for AdminUserService {
    const AREA: &'static str = "admins";
    type Action = AdminUserAction;

    async fn handle(&self, context: &ActionContext, action: AdminUserAction) -> AppResult<Value> {
        match action {
            AdminUserAction::List => encode(&self.roles.list_assignments().await?),
            AdminUserAction::AddAdmin { email, role } => self.add_admin(context, email, role).await,
            AdminUserAction::SetActive { user_id, is_active } => {
                self.patch(context, user_id, AdminAssignmentPatch::Active(is_active))
                    .await
            }
            AdminUserAction::SetDmAccess { user_id, enabled } => {
                self.patch(context, user_id, AdminAssignmentPatch::DmAccess(enabled))
                    .await
            }
            AdminUserAction::SetRole { user_id, role } => {
                self.patch(context, user_id, AdminAssignmentPatch::Role(role))
                    .await
            }
            AdminUserAction::Unknown => Err(AppError::Validation("unknown action".to_owned())),
        }
    }
}

#[cfg(test)]
mod tests;
