use std::str::FromStr;

use agora_application::AdminRoleRepository;
use agora_core::{AppResult, Principal, PrincipalId};
use agora_domain::{AdminRole, AdminRoleAssignment};
use agora_infrastructure::InMemoryAdminStore;
use serde_json::json;
use tracing::info;

const DEV_SEED_ADMIN_USER_ID: &str = "a2c8ea5f-4f39-4724-97f5-932f97f54f76";
const DEV_SEED_ADMIN_EMAIL: &str = "admin@agora.local";
const DEV_SEED_ADMIN_HANDLE: &str = "platform-admin";

/// Registers a super admin reachable through `token` in the in-memory store.
pub async fn run(store: &InMemoryAdminStore, token: &str) -> AppResult<()> {
    let admin_id = PrincipalId::from_str(DEV_SEED_ADMIN_USER_ID)?;

    store
        .register_principal(
            token,
            Principal::new(admin_id, Some(DEV_SEED_ADMIN_EMAIL.to_owned())),
        )
        .await;
    store
        .insert_profile(json!({
            "id": DEV_SEED_ADMIN_USER_ID,
            "handle": DEV_SEED_ADMIN_HANDLE,
            "full_name": "Platform Admin",
            "avatar_url": null,
            "is_locked": false,
        }))
        .await?;
    store
        .upsert_assignment(AdminRoleAssignment {
            principal_id: admin_id,
            role: AdminRole::SuperAdmin,
            is_active: true,
            dm_access_enabled: true,
            created_by: None,
            created_at: None,
        })
        .await?;

    info!(admin = %admin_id, "seeded in-memory super admin");
    Ok(())
}
