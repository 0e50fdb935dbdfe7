use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use agora_application::{
    AnalyticsRepository, BroadcastRecord, BroadcastRepository, MessageRepository, NewBroadcast,
    PlatformStats,
};
use agora_core::{AppError, AppResult};
use agora_domain::{BroadcastAudience, BroadcastStatus};

use super::{InMemoryAdminStore, Row, StoreState, clamp_len, newest_first, pick, row_id, row_time};

const TOP_CONTENT_WINDOW: usize = 50;
const TOP_USERS_WINDOW: usize = 100;
const PARTICIPANT_COLUMNS: &[&str] = &["id", "handle", "full_name", "avatar_url"];

fn count_since(rows: &[&Row], column: &str, since: DateTime<Utc>) -> i64 {
    let count = rows
        .iter()
        .filter(|row| row_time(row, column).is_some_and(|value| value >= since))
        .count();
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl BroadcastRepository for InMemoryAdminStore {
    async fn list_broadcasts(&self, limit: i64) -> AppResult<Vec<BroadcastRecord>> {
        let mut broadcasts = self.state.read().await.broadcasts.clone();
        broadcasts.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        broadcasts.truncate(clamp_len(limit));
        Ok(broadcasts)
    }

    async fn count_recipients(&self, audience: &BroadcastAudience) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(match audience {
            BroadcastAudience::All => count(state.profiles.len()),
            BroadcastAudience::Class(class_id) => count(
                state
                    .class_members
                    .iter()
                    .filter(|(member_class, _)| member_class == class_id.as_str())
                    .count(),
            ),
            BroadcastAudience::User(_) => 1,
        })
    }

    async fn create_broadcast(&self, broadcast: NewBroadcast) -> AppResult<BroadcastRecord> {
        let record = BroadcastRecord {
            id: Uuid::new_v4().to_string(),
            title: broadcast.title.to_string(),
            body: broadcast.body.to_string(),
            target_type: broadcast.audience.target_type().to_owned(),
            target_id: broadcast.audience.target_id(),
            status: broadcast.status,
            scheduled_at: broadcast.scheduled_at,
            sent_at: broadcast.sent_at,
            created_by: broadcast.created_by,
            recipient_count: broadcast.recipient_count,
            created_at: Utc::now(),
        };
        let mut state = self.state.write().await;
        if record.status == BroadcastStatus::Sent {
            fan_out(&mut state, &record, &broadcast.audience);
        }
        state.broadcasts.push(record.clone());
        Ok(record)
    }

    async fn find_broadcast(&self, broadcast_id: &str) -> AppResult<Option<BroadcastRecord>> {
        Ok(self
            .state
            .read()
            .await
            .broadcasts
            .iter()
            .find(|broadcast| broadcast.id == broadcast_id)
            .cloned())
    }

    async fn send_scheduled(
        &self,
        broadcast_id: &str,
        audience: &BroadcastAudience,
        sent_at: DateTime<Utc>,
        recipient_count: i64,
    ) -> AppResult<BroadcastRecord> {
        let mut state = self.state.write().await;
        let Some(position) = state
            .broadcasts
            .iter()
            .position(|broadcast| broadcast.id == broadcast_id)
        else {
            return Err(AppError::NotFound(format!(
                "broadcast '{broadcast_id}' not found"
            )));
        };
        if state.broadcasts[position].status != BroadcastStatus::Scheduled {
            return Err(AppError::Validation("broadcast already sent".to_owned()));
        }

        let broadcast = &mut state.broadcasts[position];
        broadcast.status = BroadcastStatus::Sent;
        broadcast.sent_at = Some(sent_at);
        broadcast.recipient_count = recipient_count;
        let record = broadcast.clone();

        fan_out(&mut state, &record, audience);
        Ok(record)
    }
}

fn fan_out(state: &mut StoreState, broadcast: &BroadcastRecord, audience: &BroadcastAudience) {
    let recipients: Vec<String> = match audience {
        BroadcastAudience::All => state.profiles.keys().cloned().collect(),
        BroadcastAudience::Class(class_id) => state
            .class_members
            .iter()
            .filter(|(member_class, _)| member_class == class_id.as_str())
            .map(|(_, user_id)| user_id.to_string())
            .collect(),
        BroadcastAudience::User(user_id) => vec![user_id.to_string()],
    };

    for user_id in recipients {
        state.notifications.push(json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "type": "system",
            "title": broadcast.title,
            "body": broadcast.body,
            "metadata": { "broadcast_id": broadcast.id },
        }));
    }
}

#[async_trait]
impl MessageRepository for InMemoryAdminStore {
    async fn list_conversations(&self, limit: i64, query: Option<&str>) -> AppResult<Vec<Value>> {
        let state = self.state.read().await;
        let needle = query
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase);

        let mut conversations: Vec<Row> = state.conversations.clone();
        conversations.sort_by(|left, right| {
            row_time(right, "updated_at").cmp(&row_time(left, "updated_at"))
        });

        let listed: Vec<Value> = conversations
            .iter()
            .filter_map(|conversation| {
                let id = row_id(conversation)?;
                let participants: Vec<Option<&Row>> = state
                    .participants
                    .get(id)
                    .map(|members| {
                        members
                            .iter()
                            .map(|member| state.profiles.get(&member.to_string()))
                            .collect()
                    })
                    .unwrap_or_default();
                let participant = |position: usize| {
                    participants
                        .get(position)
                        .copied()
                        .flatten()
                        .map_or(Value::Null, |profile| pick(profile, PARTICIPANT_COLUMNS))
                };

                if let Some(needle) = needle.as_deref() {
                    let matched = participants.iter().take(2).flatten().any(|profile| {
                        ["handle", "full_name"].iter().any(|column| {
                            profile
                                .get(*column)
                                .and_then(Value::as_str)
                                .is_some_and(|value| value.to_lowercase().contains(needle))
                        })
                    });
                    if !matched {
                        return None;
                    }
                }

                let mut messages: Vec<&Row> = state
                    .messages
                    .iter()
                    .filter(|message| {
                        message.get("conversation_id").and_then(Value::as_str) == Some(id)
                    })
                    .collect();
                messages.sort_by(|left, right| {
                    row_time(right, "created_at").cmp(&row_time(left, "created_at"))
                });
                let last = messages.first();

                Some(json!({
                    "id": id,
                    "type": conversation.get("type").cloned().unwrap_or(Value::Null),
                    "created_at": conversation.get("created_at").cloned().unwrap_or(Value::Null),
                    "updated_at": conversation.get("updated_at").cloned().unwrap_or(Value::Null),
                    "participant_1": participant(0),
                    "participant_2": participant(1),
                    "last_message": last
                        .and_then(|message| message.get("body").cloned())
                        .unwrap_or_else(|| json!("")),
                    "last_message_at": last
                        .and_then(|message| message.get("created_at").cloned())
                        .or_else(|| conversation.get("created_at").cloned())
                        .unwrap_or(Value::Null),
                    "message_count": messages.len(),
                }))
            })
            .take(clamp_len(limit))
            .collect();

        Ok(listed)
    }

    async fn list_messages(&self, conversation_id: &str, limit: i64) -> AppResult<Vec<Value>> {
        let state = self.state.read().await;
        let mut messages: Vec<Row> = state
            .messages
            .iter()
            .filter(|message| {
                message.get("conversation_id").and_then(Value::as_str) == Some(conversation_id)
            })
            .cloned()
            .collect();
        messages.sort_by(|left, right| {
            row_time(left, "created_at").cmp(&row_time(right, "created_at"))
        });
        messages.truncate(clamp_len(limit));

        Ok(messages
            .into_iter()
            .map(|mut message| {
                let sender = message
                    .get("sender_id")
                    .and_then(Value::as_str)
                    .and_then(|id| state.profiles.get(id))
                    .map_or(Value::Null, |profile| pick(profile, PARTICIPANT_COLUMNS));
                message.insert("sender".to_owned(), sender);
                Value::Object(message)
            })
            .collect())
    }
}

#[async_trait]
impl AnalyticsRepository for InMemoryAdminStore {
    async fn platform_stats(&self) -> AppResult<PlatformStats> {
        let state = self.state.read().await;
        let now = Utc::now();
        let today = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map_or(now, |midnight| midnight.and_utc());
        let month_ago = now - Duration::days(30);

        let profiles: Vec<&Row> = state.profiles.values().collect();
        let posts: Vec<&Row> = state.posts.iter().collect();
        let messages: Vec<&Row> = state.messages.iter().collect();

        Ok(PlatformStats {
            total_users: count(profiles.len()),
            dau: count_since(&profiles, "updated_at", today),
            mau: count_since(&profiles, "updated_at", month_ago),
            posts_today: count_since(&posts, "created_at", today),
            total_posts: count(posts.len()),
            messages_today: count_since(&messages, "created_at", today),
        })
    }

    async fn top_content(&self, limit: i64) -> AppResult<Vec<Value>> {
        let state = self.state.read().await;
        let mut recent: Vec<Row> = state
            .posts
            .iter()
            .filter(|post| post.get("deleted_at").is_none_or(Value::is_null))
            .cloned()
            .collect();
        newest_first(&mut recent, "created_at");
        recent.truncate(TOP_CONTENT_WINDOW);

        let metric = |post: &Row, column: &str| post.get(column).and_then(Value::as_i64).unwrap_or(0);
        let mut ranked: Vec<(i64, Value)> = recent
            .iter()
            .map(|post| {
                let likes = metric(post, "like_count");
                let reposts = metric(post, "repost_count");
                let comments = metric(post, "reply_count");
                let body = post.get("body").and_then(Value::as_str).unwrap_or_default();
                let title = if body.chars().count() > 60 {
                    format!("{}...", body.chars().take(60).collect::<String>())
                } else {
                    body.to_owned()
                };
                let author = post
                    .get("handle")
                    .and_then(Value::as_str)
                    .map_or_else(|| "Unknown".to_owned(), |handle| format!("@{handle}"));

                (
                    likes * 2 + reposts * 3 + comments * 2,
                    json!({
                        "id": post.get("id").cloned().unwrap_or(Value::Null),
                        "title": title,
                        "author": author,
                        "likes": likes,
                        "reposts": reposts,
                        "comments": comments,
                        "views": 0,
                    }),
                )
            })
            .collect();

        ranked.sort_by(|left, right| right.0.cmp(&left.0));
        ranked.truncate(clamp_len(limit));
        Ok(ranked.into_iter().map(|(_, value)| value).collect())
    }

    async fn top_users(&self, limit: i64) -> AppResult<Vec<Value>> {
        let state = self.state.read().await;
        let mut recent: Vec<Row> = state.profiles.values().cloned().collect();
        newest_first(&mut recent, "created_at");
        recent.truncate(TOP_USERS_WINDOW);

        let mut ranked: Vec<(i64, Value)> = recent
            .iter()
            .map(|profile| {
                let id = row_id(profile).unwrap_or_default();
                let followers = profile
                    .get("follower_count")
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                let posts = state
                    .posts
                    .iter()
                    .filter(|post| post.get("author_id").and_then(Value::as_str) == Some(id))
                    .count();

                (
                    followers,
                    json!({
                        "id": id,
                        "handle": profile.get("handle").and_then(Value::as_str).unwrap_or_default(),
                        "full_name": profile.get("full_name").and_then(Value::as_str).unwrap_or_default(),
                        "followers": followers,
                        "posts": posts,
                        "engagement": 0,
                    }),
                )
            })
            .collect();

        ranked.sort_by(|left, right| right.0.cmp(&left.0));
        ranked.truncate(clamp_len(limit));
        Ok(ranked.into_iter().map(|(_, value)| value).collect())
    }
}
