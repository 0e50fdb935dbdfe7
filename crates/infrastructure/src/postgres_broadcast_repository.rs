use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use agora_application::{BroadcastRecord, BroadcastRepository, NewBroadcast};
use agora_core::{AppError, AppResult, PrincipalId};
use agora_domain::{BroadcastAudience, BroadcastStatus};

use crate::row_id::parse_row_id;

/// PostgreSQL-backed broadcast store that fans out into `notifications`.
#[derive(Clone)]
pub struct PostgresBroadcastRepository {
    pool: PgPool,
}

impl PostgresBroadcastRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct BroadcastRow {
    id: Uuid,
    title: String,
    body: String,
    target_type: String,
    target_id: Option<String>,
    status: String,
    scheduled_at: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    created_by: Uuid,
    recipient_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<BroadcastRow> for BroadcastRecord {
    type Error = AppError;

    fn try_from(row: BroadcastRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "scheduled" => BroadcastStatus::Scheduled,
            "sent" => BroadcastStatus::Sent,
            other => {
                return Err(AppError::Store(format!(
                    "broadcast '{}' has an invalid stored status '{other}'",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: row.id.to_string(),
            title: row.title,
            body: row.body,
            target_type: row.target_type,
            target_id: row.target_id,
            status,
            scheduled_at: row.scheduled_at,
            sent_at: row.sent_at,
            created_by: PrincipalId::from_uuid(row.created_by),
            recipient_count: row.recipient_count,
            created_at: row.created_at,
        })
    }
}

const BROADCAST_COLUMNS: &str = "id, title, body, target_type, target_id, status, scheduled_at, \
     sent_at, created_by, recipient_count, created_at";

#[async_trait]
impl BroadcastRepository for PostgresBroadcastRepository {
    async fn list_broadcasts(&self, limit: i64) -> AppResult<Vec<BroadcastRecord>> {
        let rows = sqlx::query_as::<_, BroadcastRow>(&format!(
            "SELECT {BROADCAST_COLUMNS} FROM admin_broadcasts ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to list broadcasts: {error}")))?;

        rows.into_iter().map(BroadcastRecord::try_from).collect()
    }

    async fn count_recipients(&self, audience: &BroadcastAudience) -> AppResult<i64> {
        let count = match audience {
            BroadcastAudience::All => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles")
                    .fetch_one(&self.pool)
                    .await
            }
            BroadcastAudience::Class(class_id) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM class_members WHERE class_id::TEXT = $1",
                )
                .bind(class_id.as_str())
                .fetch_one(&self.pool)
                .await
            }
            BroadcastAudience::User(_) => return Ok(1),
        };

        count.map_err(|error| AppError::Store(format!("failed to count recipients: {error}")))
    }

    async fn create_broadcast(&self, broadcast: NewBroadcast) -> AppResult<BroadcastRecord> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Store(format!("failed to start broadcast transaction: {error}"))
        })?;

        let row = sqlx::query_as::<_, BroadcastRow>(&format!(
            r#"
            INSERT INTO admin_broadcasts (
                title,
                body,
                target_type,
                target_id,
                status,
                scheduled_at,
                sent_at,
                created_by,
                recipient_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {BROADCAST_COLUMNS}
            "#
        ))
        .bind(broadcast.title.as_str())
        .bind(broadcast.body.as_str())
        .bind(broadcast.audience.target_type())
        .bind(broadcast.audience.target_id())
        .bind(broadcast.status.as_str())
        .bind(broadcast.scheduled_at)
        .bind(broadcast.sent_at)
        .bind(broadcast.created_by.as_uuid())
        .bind(broadcast.recipient_count)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Store(format!("failed to create broadcast: {error}")))?;

        let record = BroadcastRecord::try_from(row)?;
        if record.status == BroadcastStatus::Sent {
            fan_out(&mut transaction, &record, &broadcast.audience).await?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Store(format!("failed to commit broadcast: {error}"))
        })?;

        Ok(record)
    }

    async fn find_broadcast(&self, broadcast_id: &str) -> AppResult<Option<BroadcastRecord>> {
        let Some(broadcast_uuid) = parse_row_id(broadcast_id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, BroadcastRow>(&format!(
            "SELECT {BROADCAST_COLUMNS} FROM admin_broadcasts WHERE id = $1"
        ))
        .bind(broadcast_uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to load broadcast: {error}")))?;

        row.map(BroadcastRecord::try_from).transpose()
    }

    async fn send_scheduled(
        &self,
        broadcast_id: &str,
        audience: &BroadcastAudience,
        sent_at: DateTime<Utc>,
        recipient_count: i64,
    ) -> AppResult<BroadcastRecord> {
        let not_found = || AppError::NotFound(format!("broadcast '{broadcast_id}' not found"));
        let Some(broadcast_uuid) = parse_row_id(broadcast_id) else {
            return Err(not_found());
        };

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Store(format!("failed to start broadcast send transaction: {error}"))
        })?;

        let row = sqlx::query_as::<_, BroadcastRow>(&format!(
            r#"
            UPDATE admin_broadcasts
            SET status = 'sent',
                sent_at = $2,
                recipient_count = $3
            WHERE id = $1
              AND status = 'scheduled'
            RETURNING {BROADCAST_COLUMNS}
            "#
        ))
        .bind(broadcast_uuid)
        .bind(sent_at)
        .bind(recipient_count)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Store(format!("failed to mark broadcast sent: {error}")))?;

        let Some(row) = row else {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM admin_broadcasts WHERE id = $1)",
            )
            .bind(broadcast_uuid)
            .fetch_one(&mut *transaction)
            .await
            .map_err(|error| AppError::Store(format!("failed to load broadcast: {error}")))?;

            return Err(if exists {
                AppError::Validation("broadcast already sent".to_owned())
            } else {
                not_found()
            });
        };

        let record = BroadcastRecord::try_from(row)?;
        fan_out(&mut transaction, &record, audience).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Store(format!("failed to commit broadcast send: {error}"))
        })?;

        Ok(record)
    }
}

async fn fan_out(
    connection: &mut PgConnection,
    broadcast: &BroadcastRecord,
    audience: &BroadcastAudience,
) -> AppResult<()> {
    let recipients = match audience {
        BroadcastAudience::All => "SELECT p.id FROM profiles p",
        BroadcastAudience::Class(_) => {
            "SELECT m.user_id FROM class_members m WHERE m.class_id::TEXT = $4"
        }
        BroadcastAudience::User(_) => "SELECT $4::UUID",
    };

    let query = format!(
        r#"
        INSERT INTO notifications (user_id, type, title, body, metadata)
        SELECT recipient.id, 'system', $1, $2, jsonb_build_object('broadcast_id', $3::TEXT)
        FROM ({recipients}) AS recipient(id)
        "#
    );

    let mut statement = sqlx::query(&query)
        .bind(broadcast.title.as_str())
        .bind(broadcast.body.as_str())
        .bind(broadcast.id.as_str());
    if let Some(target) = audience.target_id() {
        statement = statement.bind(target);
    }

    let result = statement
        .execute(connection)
        .await
        .map_err(|error| AppError::Store(format!("failed to fan out broadcast: {error}")))?;

    tracing::info!(
        broadcast_id = %broadcast.id,
        target_type = audience.target_type(),
        notifications = result.rows_affected(),
        "broadcast fanned out"
    );

    Ok(())
}
