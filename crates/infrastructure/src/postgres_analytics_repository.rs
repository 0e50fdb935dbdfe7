use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use agora_application::{AnalyticsRepository, PlatformStats};
use agora_core::{AppError, AppResult};

/// Recent posts considered for the top content ranking.
const TOP_CONTENT_WINDOW: i64 = 50;
/// Recent profiles considered for the top users ranking.
const TOP_USERS_WINDOW: i64 = 100;

/// Read-only PostgreSQL analytics over platform tables.
#[derive(Clone)]
pub struct PostgresAnalyticsRepository {
    pool: PgPool,
}

impl PostgresAnalyticsRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PlatformStatsRow {
    total_users: i64,
    dau: i64,
    mau: i64,
    posts_today: i64,
    total_posts: i64,
    messages_today: i64,
}

#[async_trait]
impl AnalyticsRepository for PostgresAnalyticsRepository {
    async fn platform_stats(&self) -> AppResult<PlatformStats> {
        let row = sqlx::query_as::<_, PlatformStatsRow>(
            r#"
            WITH bounds AS (
                SELECT
                    date_trunc('day', now() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC' AS today,
                    now() - INTERVAL '30 days' AS month_ago
            )
            SELECT
                (SELECT COUNT(*) FROM profiles) AS total_users,
                (SELECT COUNT(*) FROM profiles, bounds WHERE updated_at >= bounds.today) AS dau,
                (SELECT COUNT(*) FROM profiles, bounds WHERE updated_at >= bounds.month_ago) AS mau,
                (SELECT COUNT(*) FROM posts, bounds WHERE created_at >= bounds.today) AS posts_today,
                (SELECT COUNT(*) FROM posts) AS total_posts,
                (SELECT COUNT(*) FROM messages, bounds WHERE created_at >= bounds.today)
                    AS messages_today
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to compute platform stats: {error}")))?;

        Ok(PlatformStats {
            total_users: row.total_users,
            dau: row.dau,
            mau: row.mau,
            posts_today: row.posts_today,
            total_posts: row.total_posts,
            messages_today: row.messages_today,
        })
    }

    async fn top_content(&self, limit: i64) -> AppResult<Vec<Value>> {
        sqlx::query_scalar::<_, Value>(
            r#"
            WITH recent AS (
                SELECT
                    p.id,
                    p.body,
                    p.created_at,
                    a.handle AS author_handle,
                    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS likes,
                    (SELECT COUNT(*) FROM post_reposts r WHERE r.post_id = p.id) AS reposts,
                    (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id) AS comments
                FROM posts p
                LEFT JOIN profiles a ON a.id = p.author_id
                WHERE p.deleted_at IS NULL
                ORDER BY p.created_at DESC
                LIMIT $2
            )
            SELECT jsonb_build_object(
                'id', recent.id,
                'title', CASE
                    WHEN char_length(COALESCE(recent.body, '')) > 60
                        THEN left(recent.body, 60) || '...'
                    ELSE COALESCE(recent.body, '')
                END,
                'author', COALESCE('@' || recent.author_handle, 'Unknown'),
                'likes', recent.likes,
                'reposts', recent.reposts,
                'comments', recent.comments,
                'views', 0
            )
            FROM recent
            ORDER BY
                recent.likes * 2 + recent.reposts * 3 + recent.comments * 2 DESC,
                recent.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .bind(TOP_CONTENT_WINDOW)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to rank top content: {error}")))
    }

    async fn top_users(&self, limit: i64) -> AppResult<Vec<Value>> {
        sqlx::query_scalar::<_, Value>(
            r#"
            WITH recent AS (
                SELECT
                    p.id,
                    p.handle,
                    p.full_name,
                    p.created_at,
                    (SELECT COUNT(*) FROM follows f WHERE f.following_id = p.id) AS followers,
                    (SELECT COUNT(*) FROM posts o WHERE o.author_id = p.id) AS posts
                FROM profiles p
                ORDER BY p.created_at DESC
                LIMIT $2
            )
            SELECT jsonb_build_object(
                'id', recent.id,
                'handle', COALESCE(recent.handle, ''),
                'full_name', COALESCE(recent.full_name, ''),
                'followers', recent.followers,
                'posts', recent.posts,
                'engagement', 0
            )
            FROM recent
            ORDER BY recent.followers DESC, recent.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .bind(TOP_USERS_WINDOW)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to rank top users: {error}")))
    }
}
