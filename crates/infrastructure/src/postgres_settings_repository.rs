use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use agora_application::{SettingEntry, SettingsRepository};
use agora_core::{AppError, AppResult, PrincipalId};

/// PostgreSQL-backed admin settings store.
#[derive(Clone)]
pub struct PostgresSettingsRepository {
    pool: PgPool,
}

impl PostgresSettingsRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PostgresSettingsRepository {
    async fn find_setting(&self, key: &str) -> AppResult<Option<Value>> {
        sqlx::query_scalar::<_, Value>("SELECT value FROM admin_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Store(format!("failed to load setting '{key}': {error}")))
    }

    async fn list_settings(&self, pattern: &str) -> AppResult<Vec<Value>> {
        sqlx::query_scalar::<_, Value>(
            r#"
            SELECT to_jsonb(s)
            FROM admin_settings s
            WHERE s.key LIKE $1
            ORDER BY s.key ASC
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to list settings: {error}")))
    }

    async fn upsert_settings(
        &self,
        entries: &[SettingEntry],
        updated_by: PrincipalId,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Store(format!("failed to start settings transaction: {error}"))
        })?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO admin_settings (key, value, updated_by, updated_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value,
                    updated_by = EXCLUDED.updated_by,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(entry.key.as_str())
            .bind(&entry.value)
            .bind(updated_by.as_uuid())
            .bind(updated_at)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Store(format!(
                    "failed to upsert setting '{}': {error}",
                    entry.key
                ))
            })?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Store(format!("failed to commit settings: {error}")))
    }
}
