use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use agora_application::{NewPlan, PlanPatch, PlanRepository};
use agora_core::{AppError, AppResult};

/// PostgreSQL-backed subscription plan store.
#[derive(Clone)]
pub struct PostgresPlanRepository {
    pool: PgPool,
}

impl PostgresPlanRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn plan_not_found(code: &str) -> AppError {
    AppError::NotFound(format!("plan '{code}' not found"))
}

#[async_trait]
impl PlanRepository for PostgresPlanRepository {
    async fn list_plans(&self) -> AppResult<Vec<Value>> {
        sqlx::query_scalar::<_, Value>(
            "SELECT to_jsonb(p) FROM plans p ORDER BY p.created_at ASC, p.code ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to list plans: {error}")))
    }

    async fn snapshot_plan(&self, code: &str) -> AppResult<Option<Value>> {
        sqlx::query_scalar::<_, Value>("SELECT to_jsonb(p) FROM plans p WHERE p.code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Store(format!("failed to load plan: {error}")))
    }

    async fn create_plan(&self, plan: NewPlan) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO plans (code, name, description, limits, features, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(plan.code.as_str())
        .bind(plan.name.as_str())
        .bind(plan.description)
        .bind(plan.limits)
        .bind(plan.features)
        .bind(plan.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to create plan: {error}")))?;

        Ok(())
    }

    async fn update_plan(&self, code: &str, patch: &PlanPatch) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE plans
            SET name = COALESCE($2, name),
                description = CASE
                    WHEN $3::TEXT IS NULL THEN description
                    ELSE NULLIF($3, '')
                END,
                limits = COALESCE($4, limits),
                features = COALESCE($5, features),
                is_active = COALESCE($6, is_active),
                updated_at = now()
            WHERE code = $1
            "#,
        )
        .bind(code)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.limits.clone())
        .bind(patch.features.clone())
        .bind(patch.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to update plan: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(plan_not_found(code));
        }

        Ok(())
    }

    async fn delete_plan(&self, code: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM plans WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Store(format!("failed to delete plan: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(plan_not_found(code));
        }

        Ok(())
    }
}
