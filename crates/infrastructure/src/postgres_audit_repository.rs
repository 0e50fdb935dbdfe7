use async_trait::async_trait;
use sqlx::PgPool;

use agora_application::{AuditEvent, AuditRepository};
use agora_core::{AppError, AppResult};

/// PostgreSQL-backed append-only audit repository.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_audit_logs (
                actor_user_id,
                actor_role,
                action,
                target_type,
                target_id,
                before_json,
                after_json,
                ip_address,
                user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(event.actor_id.as_uuid())
        .bind(event.actor_role.as_str())
        .bind(event.action)
        .bind(event.target_type)
        .bind(event.target_id)
        .bind(event.before_json)
        .bind(event.after_json)
        .bind(event.ip_address)
        .bind(event.user_agent)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to append audit event: {error}")))?;

        Ok(())
    }
}
