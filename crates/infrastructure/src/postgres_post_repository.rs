use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use agora_application::{
    PostListQuery, PostRemoval, PostRepository, PostRestoration, PostStatusFilter,
    TrendingOverride,
};
use agora_core::{AppError, AppResult};
use agora_domain::TrendingWeights;

use crate::row_id::parse_row_id;

/// PostgreSQL-backed post moderation store.
///
/// Reads go through the platform's `admin_posts_view`; writes touch `posts`,
/// `post_moderation` and `post_trending_overrides`.
#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn post_not_found(post_id: &str) -> AppError {
    AppError::NotFound(format!("post '{post_id}' not found"))
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn list_posts(&self, query: PostListQuery) -> AppResult<Vec<Value>> {
        let status = match query.status {
            PostStatusFilter::Active => "active",
            PostStatusFilter::Removed => "removed",
            PostStatusFilter::All => "all",
        };
        let pattern = query.query.map(|value| format!("%{value}%"));

        sqlx::query_scalar::<_, Value>(
            r#"
            SELECT to_jsonb(v)
            FROM admin_posts_view v
            WHERE (
                    $1 = 'all'
                    OR ($1 = 'active' AND v.deleted_at IS NULL)
                    OR ($1 = 'removed' AND v.deleted_at IS NOT NULL)
                )
                AND ($2::TEXT IS NULL OR v.body ILIKE $2 OR v.handle ILIKE $2)
            ORDER BY v.created_at DESC
            LIMIT $3
            "#,
        )
        .bind(status)
        .bind(pattern)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to list posts: {error}")))
    }

    async fn list_trending(&self, limit: i64, weights: &TrendingWeights) -> AppResult<Vec<Value>> {
        sqlx::query_scalar::<_, Value>(
            r#"
            WITH candidates AS (
                SELECT
                    v.*,
                    COALESCE(v.like_count, 0) + COALESCE(v.repost_count, 0)
                        + COALESCE(v.reply_count, 0) + COALESCE(v.bookmark_count, 0)
                        AS interactions
                FROM admin_posts_view v
                WHERE v.deleted_at IS NULL
                    AND v.visibility = 'public'
                ORDER BY v.created_at DESC
                LIMIT $8
            ),
            scored AS (
                SELECT
                    c.*,
                    (
                        COALESCE(c.like_count, 0) * $2
                        + COALESCE(c.repost_count, 0) * $3
                        + COALESCE(c.reply_count, 0) * $4
                        + COALESCE(c.bookmark_count, 0) * $5
                    )
                    * GREATEST(COALESCE(c.trending_multiplier, 1), 0.01)
                    * exp(
                        -GREATEST(EXTRACT(EPOCH FROM (now() - c.created_at)) / 3600.0, 0) / $6
                    ) AS trend_score
                FROM candidates c
                WHERE NOT COALESCE(c.exclude_from_trending, FALSE)
                    AND c.interactions >= $7
            )
            SELECT to_jsonb(s) - 'interactions'
            FROM scored s
            ORDER BY s.trend_score DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .bind(weights.like_weight)
        .bind(weights.repost_weight)
        .bind(weights.reply_weight)
        .bind(weights.bookmark_weight)
        .bind(weights.time_decay_hours)
        .bind(weights.min_interactions)
        .bind(weights.max_candidates)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to list trending posts: {error}")))
    }

    async fn snapshot_post(&self, post_id: &str) -> AppResult<Option<Value>> {
        let Some(post_uuid) = parse_row_id(post_id) else {
            return Ok(None);
        };

        sqlx::query_scalar::<_, Value>("SELECT to_jsonb(p) FROM posts p WHERE p.id = $1")
            .bind(post_uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Store(format!("failed to load post: {error}")))
    }

    async fn remove_post(&self, removal: PostRemoval) -> AppResult<()> {
        let Some(post_uuid) = parse_row_id(removal.post_id.as_str()) else {
            return Err(post_not_found(removal.post_id.as_str()));
        };

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Store(format!("failed to start post removal transaction: {error}"))
        })?;

        let updated = sqlx::query("UPDATE posts SET deleted_at = $2 WHERE id = $1")
            .bind(post_uuid)
            .bind(removal.removed_at)
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Store(format!("failed to remove post: {error}")))?;
        if updated.rows_affected() == 0 {
            return Err(post_not_found(removal.post_id.as_str()));
        }

        sqlx::query(
            r#"
            INSERT INTO post_moderation (
                post_id,
                removed_reason,
                removed_by,
                removed_at,
                restored_by,
                restored_at
            )
            VALUES ($1, $2, $3, $4, NULL, NULL)
            ON CONFLICT (post_id) DO UPDATE
            SET removed_reason = EXCLUDED.removed_reason,
                removed_by = EXCLUDED.removed_by,
                removed_at = EXCLUDED.removed_at,
                restored_by = NULL,
                restored_at = NULL
            "#,
        )
        .bind(post_uuid)
        .bind(removal.reason.as_str())
        .bind(removal.removed_by.as_uuid())
        .bind(removal.removed_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Store(format!("failed to record post removal: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Store(format!("failed to commit post removal: {error}"))
        })
    }

    async fn restore_post(&self, restoration: PostRestoration) -> AppResult<()> {
        let Some(post_uuid) = parse_row_id(restoration.post_id.as_str()) else {
            return Err(post_not_found(restoration.post_id.as_str()));
        };

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Store(format!("failed to start post restore transaction: {error}"))
        })?;

        let updated = sqlx::query("UPDATE posts SET deleted_at = NULL WHERE id = $1")
            .bind(post_uuid)
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Store(format!("failed to restore post: {error}")))?;
        if updated.rows_affected() == 0 {
            return Err(post_not_found(restoration.post_id.as_str()));
        }

        sqlx::query(
            r#"
            INSERT INTO post_moderation (post_id, restored_by, restored_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_id) DO UPDATE
            SET restored_by = EXCLUDED.restored_by,
                restored_at = EXCLUDED.restored_at
            "#,
        )
        .bind(post_uuid)
        .bind(restoration.restored_by.as_uuid())
        .bind(restoration.restored_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Store(format!("failed to record post restore: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Store(format!("failed to commit post restore: {error}"))
        })
    }

    async fn snapshot_trending_override(&self, post_id: &str) -> AppResult<Option<Value>> {
        let Some(post_uuid) = parse_row_id(post_id) else {
            return Ok(None);
        };

        sqlx::query_scalar::<_, Value>(
            "SELECT to_jsonb(o) FROM post_trending_overrides o WHERE o.post_id = $1",
        )
        .bind(post_uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to load trending override: {error}")))
    }

    async fn upsert_trending_override(&self, override_row: TrendingOverride) -> AppResult<()> {
        let Some(post_uuid) = parse_row_id(override_row.post_id.as_str()) else {
            return Err(post_not_found(override_row.post_id.as_str()));
        };

        sqlx::query(
            r#"
            INSERT INTO post_trending_overrides (
                post_id,
                trending_multiplier,
                exclude_from_trending,
                note,
                updated_by,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (post_id) DO UPDATE
            SET trending_multiplier = EXCLUDED.trending_multiplier,
                exclude_from_trending = EXCLUDED.exclude_from_trending,
                note = EXCLUDED.note,
                updated_by = EXCLUDED.updated_by,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(post_uuid)
        .bind(override_row.trending_multiplier.value())
        .bind(override_row.exclude_from_trending)
        .bind(override_row.note)
        .bind(override_row.updated_by.as_uuid())
        .bind(override_row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to upsert trending override: {error}")))?;

        Ok(())
    }
}
