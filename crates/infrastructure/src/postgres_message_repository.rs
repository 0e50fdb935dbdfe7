use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use agora_application::MessageRepository;
use agora_core::{AppError, AppResult};

use crate::row_id::parse_row_id;

/// Read-only PostgreSQL view over private conversations.
#[derive(Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn list_conversations(&self, limit: i64, query: Option<&str>) -> AppResult<Vec<Value>> {
        let pattern = query
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| format!("%{value}%"));

        sqlx::query_scalar::<_, Value>(
            r#"
            WITH participants AS (
                SELECT
                    cp.conversation_id,
                    jsonb_build_object(
                        'id', p.id,
                        'handle', p.handle,
                        'full_name', p.full_name,
                        'avatar_url', p.avatar_url
                    ) AS profile,
                    p.handle,
                    p.full_name,
                    row_number() OVER (
                        PARTITION BY cp.conversation_id
                        ORDER BY cp.joined_at ASC, cp.user_id ASC
                    ) AS position
                FROM conversation_participants cp
                LEFT JOIN profiles p ON p.id = cp.user_id
            )
            SELECT jsonb_build_object(
                'id', c.id,
                'type', c.type,
                'created_at', c.created_at,
                'updated_at', c.updated_at,
                'participant_1', first.profile,
                'participant_2', second.profile,
                'last_message', COALESCE(last_message.body, ''),
                'last_message_at', COALESCE(last_message.created_at, c.created_at),
                'message_count', (
                    SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id
                )
            )
            FROM conversations c
            LEFT JOIN participants first
                ON first.conversation_id = c.id AND first.position = 1
            LEFT JOIN participants second
                ON second.conversation_id = c.id AND second.position = 2
            LEFT JOIN LATERAL (
                SELECT m.body, m.created_at
                FROM messages m
                WHERE m.conversation_id = c.id
                ORDER BY m.created_at DESC
                LIMIT 1
            ) last_message ON TRUE
            WHERE $2::TEXT IS NULL
                OR first.handle ILIKE $2
                OR first.full_name ILIKE $2
                OR second.handle ILIKE $2
                OR second.full_name ILIKE $2
            ORDER BY c.updated_at DESC NULLS LAST
            LIMIT $1
            "#,
        )
        .bind(limit)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to list conversations: {error}")))
    }

    async fn list_messages(&self, conversation_id: &str, limit: i64) -> AppResult<Vec<Value>> {
        let Some(conversation_uuid) = parse_row_id(conversation_id) else {
            return Ok(Vec::new());
        };

        sqlx::query_scalar::<_, Value>(
            r#"
            SELECT jsonb_build_object(
                'id', m.id,
                'sender_id', m.sender_id,
                'body', m.body,
                'created_at', m.created_at,
                'deleted_at', m.deleted_at,
                'sender', (
                    SELECT jsonb_build_object(
                        'id', p.id,
                        'handle', p.handle,
                        'full_name', p.full_name,
                        'avatar_url', p.avatar_url
                    )
                    FROM profiles p
                    WHERE p.id = m.sender_id
                )
            )
            FROM messages m
            WHERE m.conversation_id = $1
            ORDER BY m.created_at ASC
            LIMIT $2
            "#,
        )
        .bind(conversation_uuid)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Store(format!("failed to list messages: {error}")))
    }
}
