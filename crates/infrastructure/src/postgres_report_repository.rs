use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use agora_application::{ReportRepository, ReportReview};
use agora_core::{AppError, AppResult};
use agora_domain::ReportStatus;

use crate::row_id::parse_row_id;

/// PostgreSQL-backed user report store.
#[derive(Clone)]
pub struct PostgresReportRepository {
    pool: PgPool,
}

impl PostgresReportRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepository for PostgresReportRepository {
    async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        limit: i64,
    ) -> AppResult<Vec<Value>> {
        sqlx::query_scalar::<_, Value>(
            r#"
            SELECT to_jsonb(r) || jsonb_build_object(
                'reporter', (
                    SELECT jsonb_build_object(
                        'id', p.id,
                        'handle', p.handle,
                        'full_name', p.full_name,
                        'avatar_url', p.avatar_url
                    )
                    FROM profiles p
                    WHERE p.id = r.reporter_id
                ),
                'reviewer', (
                    SELECT jsonb_build_object(
                        'id', p.id,
                        'handle', p.handle,
                        'full_name', p.full_name
                    )
                    FROM profiles p
                    WHERE p.id = r.reviewed_by
                )
            )
            FROM reports r
            WHERE ($1::TEXT IS NULL OR r.status = $1)
            ORDER BY r.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(status.map(|value| value.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to list reports: {error}")))
    }

    async fn snapshot_report(&self, report_id: &str) -> AppResult<Option<Value>> {
        let Some(report_uuid) = parse_row_id(report_id) else {
            return Ok(None);
        };

        sqlx::query_scalar::<_, Value>("SELECT to_jsonb(r) FROM reports r WHERE r.id = $1")
            .bind(report_uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Store(format!("failed to load report: {error}")))
    }

    async fn review_report(&self, report_id: &str, review: ReportReview) -> AppResult<()> {
        let not_found = || AppError::NotFound(format!("report '{report_id}' not found"));
        let Some(report_uuid) = parse_row_id(report_id) else {
            return Err(not_found());
        };

        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = $2,
                reviewed_by = $3,
                reviewed_at = $4,
                resolution_notes = COALESCE($5, resolution_notes),
                action_taken = COALESCE($6, action_taken)
            WHERE id = $1
            "#,
        )
        .bind(report_uuid)
        .bind(review.status.as_str())
        .bind(review.reviewed_by.as_uuid())
        .bind(review.reviewed_at)
        .bind(review.resolution_notes)
        .bind(review.action_taken.map(|value| value.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to review report: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }

        Ok(())
    }
}
