use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgQueryResult;
use sqlx::{PgPool, Postgres, QueryBuilder};

use agora_application::{ProfileLock, ProfileRepository, UserBoost, VerificationUpdate};
use agora_core::{AppError, AppResult, PrincipalId};
use agora_domain::{EditableProfileField, ProfileEdits};

/// PostgreSQL-backed moderation writes on member `profiles`.
#[derive(Clone)]
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn require_profile(
    result: Result<PgQueryResult, sqlx::Error>,
    user_id: PrincipalId,
    operation: &str,
) -> AppResult<()> {
    let result = result
        .map_err(|error| AppError::Store(format!("failed to {operation}: {error}")))?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("user '{user_id}' not found")));
    }

    Ok(())
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn snapshot_profile(&self, user_id: PrincipalId) -> AppResult<Option<Value>> {
        sqlx::query_scalar::<_, Value>("SELECT to_jsonb(p) FROM profiles p WHERE p.id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Store(format!("failed to load profile: {error}")))
    }

    async fn set_verification(
        &self,
        user_id: PrincipalId,
        update: VerificationUpdate,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET verified_type = $2,
                verified_at = $3,
                verified_by = $4,
                verified_expires_at = $5
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(update.verified_type.as_str())
        .bind(update.verified_at)
        .bind(update.verified_by.map(|value| value.as_uuid()))
        .bind(update.verified_expires_at)
        .execute(&self.pool)
        .await;

        require_profile(result, user_id, "set verification")
    }

    async fn lock_profile(&self, user_id: PrincipalId, lock: ProfileLock) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET is_locked = TRUE,
                locked_reason = $2,
                locked_at = $3,
                locked_until = $4,
                locked_by = $5
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(lock.reason.as_str())
        .bind(lock.locked_at)
        .bind(lock.locked_until)
        .bind(lock.locked_by.as_uuid())
        .execute(&self.pool)
        .await;

        require_profile(result, user_id, "lock profile")
    }

    async fn unlock_profile(&self, user_id: PrincipalId) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET is_locked = FALSE,
                locked_reason = NULL,
                locked_at = NULL,
                locked_until = NULL,
                locked_by = NULL
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await;

        require_profile(result, user_id, "unlock profile")
    }

    async fn set_boost(&self, user_id: PrincipalId, boost: UserBoost) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET boost_multiplier = $2,
                boost_expires_at = $3,
                boosted_by = $4
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(boost.multiplier.value())
        .bind(boost.expires_at)
        .bind(boost.boosted_by.as_uuid())
        .execute(&self.pool)
        .await;

        require_profile(result, user_id, "set boost")
    }

    async fn apply_profile_edits(
        &self,
        user_id: PrincipalId,
        edits: &ProfileEdits,
    ) -> AppResult<()> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE profiles SET ");
        let mut columns = builder.separated(", ");
        for (field, value) in edits.fields() {
            columns.push(field.column());
            columns.push_unseparated(" = ");
            match field {
                EditableProfileField::IsPrivate => {
                    columns.push_bind_unseparated(value.as_bool());
                }
                _ => {
                    columns.push_bind_unseparated(value.as_str().map(str::to_owned));
                }
            }
        }
        builder.push(" WHERE id = ");
        builder.push_bind(user_id.as_uuid());

        let result = builder.build().execute(&self.pool).await;
        require_profile(result, user_id, "update profile")
    }
}
