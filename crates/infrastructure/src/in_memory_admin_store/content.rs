use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

use agora_application::{
    PostListQuery, PostRemoval, PostRepository, PostRestoration, PostStatusFilter, ProfileLock,
    ProfileRepository, ReportRepository, ReportReview, TrendingOverride, UserBoost,
    VerificationUpdate,
};
use agora_core::{AppError, AppResult, PrincipalId};
use agora_domain::{ProfileEdits, ReportStatus, TrendingWeights};

use super::{InMemoryAdminStore, Row, clamp_len, newest_first, pick, row_id, row_time, timestamp};

fn profile_not_found(user_id: PrincipalId) -> AppError {
    AppError::NotFound(format!("profile '{user_id}' not found"))
}

fn post_not_found(post_id: &str) -> AppError {
    AppError::NotFound(format!("post '{post_id}' not found"))
}

fn optional_timestamp(value: Option<chrono::DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, timestamp)
}

fn counter(row: &Row, column: &str) -> f64 {
    row.get(column).and_then(Value::as_f64).unwrap_or(0.0)
}

impl InMemoryAdminStore {
    async fn update_profile(
        &self,
        user_id: PrincipalId,
        columns: Vec<(&str, Value)>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let Some(profile) = state.profiles.get_mut(&user_id.to_string()) else {
            return Err(profile_not_found(user_id));
        };

        for (column, value) in columns {
            profile.insert(column.to_owned(), value);
        }

        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryAdminStore {
    async fn snapshot_profile(&self, user_id: PrincipalId) -> AppResult<Option<Value>> {
        Ok(self
            .state
            .read()
            .await
            .profiles
            .get(&user_id.to_string())
            .cloned()
            .map(Value::Object))
    }

    async fn set_verification(
        &self,
        user_id: PrincipalId,
        update: VerificationUpdate,
    ) -> AppResult<()> {
        self.update_profile(
            user_id,
            vec![
                ("verified_type", json!(update.verified_type)),
                ("verified_at", optional_timestamp(update.verified_at)),
                (
                    "verified_by",
                    update
                        .verified_by
                        .map_or(Value::Null, |value| json!(value)),
                ),
                (
                    "verified_expires_at",
                    optional_timestamp(update.verified_expires_at),
                ),
            ],
        )
        .await
    }

    async fn lock_profile(&self, user_id: PrincipalId, lock: ProfileLock) -> AppResult<()> {
        self.update_profile(
            user_id,
            vec![
                ("is_locked", Value::Bool(true)),
                ("locked_reason", json!(lock.reason.as_str())),
                ("locked_at", timestamp(lock.locked_at)),
                ("locked_until", optional_timestamp(lock.locked_until)),
                ("locked_by", json!(lock.locked_by)),
            ],
        )
        .await
    }

    async fn unlock_profile(&self, user_id: PrincipalId) -> AppResult<()> {
        self.update_profile(
            user_id,
            vec![
                ("is_locked", Value::Bool(false)),
                ("locked_reason", Value::Null),
                ("locked_at", Value::Null),
                ("locked_until", Value::Null),
                ("locked_by", Value::Null),
            ],
        )
        .await
    }

    async fn set_boost(&self, user_id: PrincipalId, boost: UserBoost) -> AppResult<()> {
        self.update_profile(
            user_id,
            vec![
                ("boost_multiplier", json!(boost.multiplier.value())),
                ("boost_expires_at", optional_timestamp(boost.expires_at)),
                ("boosted_by", json!(boost.boosted_by)),
            ],
        )
        .await
    }

    async fn apply_profile_edits(
        &self,
        user_id: PrincipalId,
        edits: &ProfileEdits,
    ) -> AppResult<()> {
        self.update_profile(
            user_id,
            edits
                .fields()
                .iter()
                .map(|(field, value)| (field.column(), value.clone()))
                .collect(),
        )
        .await
    }
}

#[async_trait]
impl PostRepository for InMemoryAdminStore {
    async fn list_posts(&self, query: PostListQuery) -> AppResult<Vec<Value>> {
        let needle = query.query.map(|value| value.to_lowercase());
        let contains = |row: &Row, column: &str, needle: &str| {
            row.get(column)
                .and_then(Value::as_str)
                .is_some_and(|value| value.to_lowercase().contains(needle))
        };

        let mut posts: Vec<Row> = self
            .state
            .read()
            .await
            .posts
            .iter()
            .filter(|post| {
                let removed = post.get("deleted_at").is_some_and(|value| !value.is_null());
                match query.status {
                    PostStatusFilter::Active => !removed,
                    PostStatusFilter::Removed => removed,
                    PostStatusFilter::All => true,
                }
            })
            .filter(|post| {
                needle.as_deref().is_none_or(|needle| {
                    contains(post, "body", needle) || contains(post, "handle", needle)
                })
            })
            .cloned()
            .collect();

        newest_first(&mut posts, "created_at");
        posts.truncate(clamp_len(query.limit));
        Ok(posts.into_iter().map(Value::Object).collect())
    }

    async fn list_trending(&self, limit: i64, weights: &TrendingWeights) -> AppResult<Vec<Value>> {
        let state = self.state.read().await;
        let now = Utc::now();

        let mut candidates: Vec<&Row> = state
            .posts
            .iter()
            .filter(|post| post.get("deleted_at").is_none_or(Value::is_null))
            .filter(|post| post.get("visibility").and_then(Value::as_str) == Some("public"))
            .collect();
        candidates.sort_by(|left, right| {
            row_time(right, "created_at").cmp(&row_time(left, "created_at"))
        });
        candidates.truncate(clamp_len(weights.max_candidates));

        let mut scored: Vec<(f64, Row)> = candidates
            .into_iter()
            .filter_map(|post| {
                let id = row_id(post)?;
                let trending_override = state.trending_overrides.get(id);
                let excluded = trending_override
                    .and_then(|row| row.get("exclude_from_trending"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let counters = [
                    counter(post, "like_count"),
                    counter(post, "repost_count"),
                    counter(post, "reply_count"),
                    counter(post, "bookmark_count"),
                ];
                if excluded || counters.iter().sum::<f64>() < weights.min_interactions {
                    return None;
                }

                let multiplier = trending_override
                    .and_then(|row| row.get("trending_multiplier"))
                    .and_then(Value::as_f64);
                let age_hours = row_time(post, "created_at")
                    .map(|created_at| (now - created_at).num_seconds() as f64 / 3600.0)
                    .unwrap_or(0.0)
                    .max(0.0);
                let score = weights.score(counters, multiplier, age_hours);

                let mut row = post.clone();
                row.insert("trend_score".to_owned(), json!(score));
                Some((score, row))
            })
            .collect();

        scored.sort_by(|left, right| right.0.total_cmp(&left.0));
        scored.truncate(clamp_len(limit));
        Ok(scored
            .into_iter()
            .map(|(_, row)| Value::Object(row))
            .collect())
    }

    async fn snapshot_post(&self, post_id: &str) -> AppResult<Option<Value>> {
        Ok(self
            .state
            .read()
            .await
            .posts
            .iter()
            .find(|post| row_id(post) == Some(post_id))
            .cloned()
            .map(Value::Object))
    }

    async fn remove_post(&self, removal: PostRemoval) -> AppResult<()> {
        let post_id = removal.post_id.as_str();
        let mut state = self.state.write().await;
        let Some(post) = state
            .posts
            .iter_mut()
            .find(|post| row_id(post) == Some(post_id))
        else {
            return Err(post_not_found(post_id));
        };
        post.insert("deleted_at".to_owned(), timestamp(removal.removed_at));

        let record = state
            .post_moderation
            .entry(post_id.to_owned())
            .or_default();
        record.insert("post_id".to_owned(), json!(post_id));
        record.insert("removed_reason".to_owned(), json!(removal.reason.as_str()));
        record.insert("removed_by".to_owned(), json!(removal.removed_by));
        record.insert("removed_at".to_owned(), timestamp(removal.removed_at));
        record.insert("restored_by".to_owned(), Value::Null);
        record.insert("restored_at".to_owned(), Value::Null);

        Ok(())
    }

    async fn restore_post(&self, restoration: PostRestoration) -> AppResult<()> {
        let post_id = restoration.post_id.as_str();
        let mut state = self.state.write().await;
        let Some(post) = state
            .posts
            .iter_mut()
            .find(|post| row_id(post) == Some(post_id))
        else {
            return Err(post_not_found(post_id));
        };
        post.insert("deleted_at".to_owned(), Value::Null);

        let record = state
            .post_moderation
            .entry(post_id.to_owned())
            .or_default();
        record.insert("post_id".to_owned(), json!(post_id));
        record.insert("restored_by".to_owned(), json!(restoration.restored_by));
        record.insert(
            "restored_at".to_owned(),
            timestamp(restoration.restored_at),
        );

        Ok(())
    }

    async fn snapshot_trending_override(&self, post_id: &str) -> AppResult<Option<Value>> {
        Ok(self
            .state
            .read()
            .await
            .trending_overrides
            .get(post_id)
            .cloned()
            .map(Value::Object))
    }

    async fn upsert_trending_override(&self, override_row: TrendingOverride) -> AppResult<()> {
        let post_id = override_row.post_id.to_string();
        let mut state = self.state.write().await;
        if !state
            .posts
            .iter()
            .any(|post| row_id(post) == Some(post_id.as_str()))
        {
            return Err(post_not_found(post_id.as_str()));
        }

        let Value::Object(row) = json!({
            "post_id": post_id,
            "trending_multiplier": override_row.trending_multiplier.value(),
            "exclude_from_trending": override_row.exclude_from_trending,
            "note": override_row.note,
            "updated_by": override_row.updated_by,
            "updated_at": timestamp(override_row.updated_at),
        }) else {
            return Err(AppError::Internal(
                "trending override must serialize to an object".to_owned(),
            ));
        };
        state.trending_overrides.insert(post_id, row);

        Ok(())
    }
}

#[async_trait]
impl ReportRepository for InMemoryAdminStore {
    async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        limit: i64,
    ) -> AppResult<Vec<Value>> {
        let state = self.state.read().await;
        let summary = |row: &Row, column: &str, columns: &[&str]| {
            row.get(column)
                .and_then(Value::as_str)
                .and_then(|id| state.profiles.get(id))
                .map_or(Value::Null, |profile| pick(profile, columns))
        };

        let mut reports: Vec<Row> = state
            .reports
            .iter()
            .filter(|report| {
                status.is_none_or(|status| {
                    report.get("status").and_then(Value::as_str) == Some(status.as_str())
                })
            })
            .cloned()
            .collect();
        newest_first(&mut reports, "created_at");
        reports.truncate(clamp_len(limit));

        Ok(reports
            .into_iter()
            .map(|mut report| {
                let reporter = summary(
                    &report,
                    "reporter_id",
                    &["id", "handle", "full_name", "avatar_url"],
                );
                let reviewer = summary(&report, "reviewed_by", &["id", "handle", "full_name"]);
                report.insert("reporter".to_owned(), reporter);
                report.insert("reviewer".to_owned(), reviewer);
                Value::Object(report)
            })
            .collect())
    }

    async fn snapshot_report(&self, report_id: &str) -> AppResult<Option<Value>> {
        Ok(self
            .state
            .read()
            .await
            .reports
            .iter()
            .find(|report| row_id(report) == Some(report_id))
            .cloned()
            .map(Value::Object))
    }

    async fn review_report(&self, report_id: &str, review: ReportReview) -> AppResult<()> {
        let mut state = self.state.write().await;
        let Some(report) = state
            .reports
            .iter_mut()
            .find(|report| row_id(report) == Some(report_id))
        else {
            return Err(AppError::NotFound(format!(
                "report '{report_id}' not found"
            )));
        };

        report.insert("status".to_owned(), json!(review.status.as_str()));
        report.insert("reviewed_by".to_owned(), json!(review.reviewed_by));
        report.insert("reviewed_at".to_owned(), timestamp(review.reviewed_at));
        if let Some(notes) = review.resolution_notes {
            report.insert("resolution_notes".to_owned(), json!(notes));
        }
        if let Some(action_taken) = review.action_taken {
            report.insert("action_taken".to_owned(), json!(action_taken.as_str()));
        }

        Ok(())
    }
}
