use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use agora_application::{AuditLogEntry, AuditLogRepository};
use agora_core::{AppError, AppResult, PrincipalId};
use agora_domain::AdminRole;

/// PostgreSQL-backed repository for audit log reads.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    id: Uuid,
    actor_user_id: Uuid,
    actor_role: String,
    action: String,
    target_type: Option<String>,
    target_id: Option<String>,
    before_json: Option<Value>,
    after_json: Option<Value>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditLogRow> for AuditLogEntry {
    type Error = AppError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let actor_role = AdminRole::from_str(row.actor_role.as_str()).map_err(|error| {
            AppError::Store(format!(
                "audit entry '{}' has an invalid actor role: {error}",
                row.id
            ))
        })?;

        Ok(Self {
            id: row.id.to_string(),
            actor_user_id: PrincipalId::from_uuid(row.actor_user_id),
            actor_role,
            action: row.action,
            target_type: row.target_type,
            target_id: row.target_id,
            before_json: row.before_json,
            after_json: row.after_json,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn list_recent(&self, limit: i64) -> AppResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT
                id,
                actor_user_id,
                actor_role,
                action,
                target_type,
                target_id,
                before_json,
                after_json,
                ip_address,
                user_agent,
                created_at
            FROM admin_audit_logs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to list audit log entries: {error}")))?;

        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }

    async fn list_for_target(
        &self,
        target_type: &str,
        target_id: &str,
        limit: i64,
    ) -> AppResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT
                id,
                actor_user_id,
                actor_role,
                action,
                target_type,
                target_id,
                before_json,
                after_json,
                ip_address,
                user_agent,
                created_at
            FROM admin_audit_logs
            WHERE target_type = $1
                AND target_id = $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(target_type)
        .bind(target_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to list audit log entries: {error}")))?;

        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }
}
