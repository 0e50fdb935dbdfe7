use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use agora_application::{AdminAssignmentPatch, AdminListing, AdminRoleRepository};
use agora_core::{AppError, AppResult, PrincipalId};
use agora_domain::{AdminRole, AdminRoleAssignment};

/// PostgreSQL-backed role store over `admin_users`.
#[derive(Clone)]
pub struct PostgresAdminRoleRepository {
    pool: PgPool,
}

impl PostgresAdminRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AdminUserRow {
    user_id: Uuid,
    role: String,
    is_active: bool,
    dm_access_enabled: bool,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct AdminListingRow {
    #[sqlx(flatten)]
    admin: AdminUserRow,
    profiles: Option<Value>,
}

impl TryFrom<AdminUserRow> for AdminRoleAssignment {
    type Error = AppError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        let role = AdminRole::from_str(row.role.as_str()).map_err(|error| {
            AppError::Store(format!(
                "admin user '{}' has an invalid stored role: {error}",
                row.user_id
            ))
        })?;

        Ok(Self {
            principal_id: PrincipalId::from_uuid(row.user_id),
            role,
            is_active: row.is_active,
            dm_access_enabled: row.dm_access_enabled,
            created_by: row.created_by.map(PrincipalId::from_uuid),
            created_at: Some(row.created_at),
        })
    }
}

const PROFILE_SUMMARY: &str = r#"
    SELECT jsonb_build_object(
        'id', p.id,
        'handle', p.handle,
        'full_name', p.full_name,
        'avatar_url', p.avatar_url
    )
    FROM profiles p
    WHERE p.id = $1
"#;

#[async_trait]
impl AdminRoleRepository for PostgresAdminRoleRepository {
    async fn find_assignment(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Option<AdminRoleAssignment>> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r#"
            SELECT user_id, role, is_active, dm_access_enabled, created_by, created_at
            FROM admin_users
            WHERE user_id = $1
            "#,
        )
        .bind(principal_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to load admin user: {error}")))?;

        row.map(AdminRoleAssignment::try_from).transpose()
    }

    async fn list_assignments(&self) -> AppResult<Vec<AdminListing>> {
        let rows = sqlx::query_as::<_, AdminListingRow>(
            r#"
            SELECT
                a.user_id,
                a.role,
                a.is_active,
                a.dm_access_enabled,
                a.created_by,
                a.created_at,
                (
                    SELECT jsonb_build_object(
                        'id', p.id,
                        'handle', p.handle,
                        'full_name', p.full_name,
                        'avatar_url', p.avatar_url
                    )
                    FROM profiles p
                    WHERE p.id = a.user_id
                ) AS profiles
            FROM admin_users a
            ORDER BY a.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to list admin users: {error}")))?;

        rows.into_iter()
            .map(|row| {
                Ok(AdminListing {
                    assignment: AdminRoleAssignment::try_from(row.admin)?,
                    profiles: row.profiles,
                })
            })
            .collect()
    }

    async fn upsert_assignment(&self, assignment: AdminRoleAssignment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_users (
                user_id,
                role,
                is_active,
                dm_access_enabled,
                created_by,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, now()))
            ON CONFLICT (user_id) DO UPDATE
            SET role = EXCLUDED.role,
                is_active = EXCLUDED.is_active,
                dm_access_enabled = EXCLUDED.dm_access_enabled,
                created_by = EXCLUDED.created_by
            "#,
        )
        .bind(assignment.principal_id.as_uuid())
        .bind(assignment.role.as_str())
        .bind(assignment.is_active)
        .bind(assignment.dm_access_enabled)
        .bind(assignment.created_by.map(|value| value.as_uuid()))
        .bind(assignment.created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to upsert admin user: {error}")))?;

        Ok(())
    }

    async fn update_assignment(
        &self,
        principal_id: PrincipalId,
        patch: AdminAssignmentPatch,
    ) -> AppResult<()> {
        let query = match patch {
            AdminAssignmentPatch::Role(role) => {
                sqlx::query("UPDATE admin_users SET role = $2 WHERE user_id = $1")
                    .bind(principal_id.as_uuid())
                    .bind(role.as_str())
            }
            AdminAssignmentPatch::Active(is_active) => {
                sqlx::query("UPDATE admin_users SET is_active = $2 WHERE user_id = $1")
                    .bind(principal_id.as_uuid())
                    .bind(is_active)
            }
            AdminAssignmentPatch::DmAccess(enabled) => {
                sqlx::query("UPDATE admin_users SET dm_access_enabled = $2 WHERE user_id = $1")
                    .bind(principal_id.as_uuid())
                    .bind(enabled)
            }
        };

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Store(format!("failed to update admin user: {error}")))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "admin user '{principal_id}' not found"
            )));
        }

        Ok(())
    }

    async fn find_profile_summary(&self, principal_id: PrincipalId) -> AppResult<Option<Value>> {
        sqlx::query_scalar::<_, Value>(PROFILE_SUMMARY)
            .bind(principal_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Store(format!("failed to load profile summary: {error}")))
    }
}
