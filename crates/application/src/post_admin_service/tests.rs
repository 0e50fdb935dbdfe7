use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use agora_core::{AppError, AppResult, PrincipalId};
use agora_domain::{
    AdminRole, DEFAULT_REMOVAL_REASON, MODERATION_POSTS_SETTING_KEY, TrendingWeights,
};

use crate::test_support::{FailingAuditRepository, RecordingAuditRepository, context_for};
use crate::{
    ActionHandler, AuditRecorder, PostListQuery, PostRemoval, PostRepository, PostRestoration,
    SettingEntry, SettingsRepository, TrendingOverride,
};

use super::{PostAction, PostAdminService};

#[derive(Default)]
struct FakeContentStore {
    posts: Mutex<HashMap<String, Value>>,
    moderation: Mutex<HashMap<String, Value>>,
    overrides: Mutex<HashMap<String, Value>>,
    settings: Mutex<HashMap<String, Value>>,
}

#[async_trait]
impl PostRepository for FakeContentStore {
    async fn list_posts(&self, _query: PostListQuery) -> AppResult<Vec<Value>> {
        Ok(self.posts.lock().await.values().cloned().collect())
    }

    async fn list_trending(
        &self,
        _limit: i64,
        _weights: &TrendingWeights,
    ) -> AppResult<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn snapshot_post(&self, post_id: &str) -> AppResult<Option<Value>> {
        Ok(self.posts.lock().await.get(post_id).cloned())
    }

    async fn remove_post(&self, removal: PostRemoval) -> AppResult<()> {
        let mut posts = self.posts.lock().await;
        let Some(post) = posts.get_mut(removal.post_id.as_str()) else {
            return Err(AppError::NotFound("post not found".to_owned()));
        };
        post["deleted_at"] = json!(removal.removed_at);
        self.moderation.lock().await.insert(
            removal.post_id.to_string(),
            json!({ "removed_reason": removal.reason, "removed_by": removal.removed_by }),
        );
        Ok(())
    }

    async fn restore_post(&self, restoration: PostRestoration) -> AppResult<()> {
        let mut posts = self.posts.lock().await;
        let Some(post) = posts.get_mut(restoration.post_id.as_str()) else {
            return Err(AppError::NotFound("post not found".to_owned()));
        };
        post["deleted_at"] = Value::Null;
        Ok(())
    }

    async fn snapshot_trending_override(&self, post_id: &str) -> AppResult<Option<Value>> {
        Ok(self.overrides.lock().await.get(post_id).cloned())
    }

    async fn upsert_trending_override(&self, override_row: TrendingOverride) -> AppResult<()> {
        let Ok(value) = serde_json::to_value(&override_row) else {
            return Err(AppError::Internal("override should encode".to_owned()));
        };
        self.overrides
            .lock()
            .await
            .insert(override_row.post_id.to_string(), value);
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for FakeContentStore {
    async fn find_setting(&self, key: &str) -> AppResult<Option<Value>> {
        Ok(self.settings.lock().await.get(key).cloned())
    }

    async fn list_settings(&self, _pattern: &str) -> AppResult<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn upsert_settings(
        &self,
        entries: &[SettingEntry],
        _updated_by: PrincipalId,
        _updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut settings = self.settings.lock().await;
        for entry in entries {
            settings.insert(entry.key.to_string(), entry.value.clone());
        }
        Ok(())
    }
}

struct Fixture {
    service: PostAdminService,
    store: Arc<FakeContentStore>,
    audit: Arc<RecordingAuditRepository>,
}

async fn fixture(policy: Option<Value>) -> Fixture {
    let store = Arc::new(FakeContentStore::default());
    store.posts.lock().await.insert(
        "post-1".to_owned(),
        json!({ "id": "post-1", "body": "buy followers", "deleted_at": null }),
    );
    if let Some(policy) = policy {
        store
            .settings
            .lock()
            .await
            .insert(MODERATION_POSTS_SETTING_KEY.to_owned(), policy);
    }
    let audit = Arc::new(RecordingAuditRepository::default());

    Fixture {
        service: PostAdminService::new(
            store.clone(),
            store.clone(),
            AuditRecorder::new(audit.clone()),
        ),
        store,
        audit,
    }
}

fn remove(reason: &str) -> PostAction {
    PostAction::Remove {
        post_id: "post-1".to_owned(),
        reason: Some(reason.to_owned()),
    }
}

#[tokio::test]
async fn moderator_removal_records_reason_and_before_state() {
    let fixture = fixture(None).await;

    let result = fixture
        .service
        .handle(&context_for(AdminRole::Moderator), remove("Spam"))
        .await;
    assert!(result.is_ok());

    let posts = fixture.store.posts.lock().await;
    assert!(posts.get("post-1").is_some_and(|post| !post["deleted_at"].is_null()));
    let moderation = fixture.store.moderation.lock().await;
    assert_eq!(moderation.get("post-1").map(|row| row["removed_reason"].clone()), Some(json!("Spam")));

    let events = fixture.audit.events.lock().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "remove-post");
    assert_eq!(
        events[0].before_json.as_ref().map(|before| before["body"].clone()),
        Some(json!("buy followers"))
    );
    assert_eq!(
        events[0].after_json.as_ref().map(|after| after["reason"].clone()),
        Some(json!("Spam"))
    );
}

#[tokio::test]
async fn blank_reason_is_rejected_when_policy_requires_one() {
    let fixture = fixture(Some(json!({ "require_removal_reason": true }))).await;

    let result = fixture
        .service
        .handle(&context_for(AdminRole::Moderator), remove("   "))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(fixture.store.moderation.lock().await.is_empty());
    assert!(fixture.audit.events.lock().await.is_empty());
}

#[tokio::test]
async fn blank_reason_uses_placeholder_when_policy_allows() {
    let fixture = fixture(Some(json!({ "require_removal_reason": false }))).await;

    let result = fixture
        .service
        .handle(&context_for(AdminRole::Moderator), remove(""))
        .await;
    assert!(result.is_ok());

    let moderation = fixture.store.moderation.lock().await;
    assert_eq!(
        moderation.get("post-1").map(|row| row["removed_reason"].clone()),
        Some(json!(DEFAULT_REMOVAL_REASON))
    );
}

#[tokio::test]
async fn restore_is_forbidden_when_policy_disables_it() {
    let fixture = fixture(Some(json!({ "allow_restore_post": false }))).await;

    let result = fixture
        .service
        .handle(
            &context_for(AdminRole::Moderator),
            PostAction::Restore {
                post_id: "post-1".to_owned(),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert!(fixture.audit.events.lock().await.is_empty());
}

#[tokio::test]
async fn trending_override_is_upserted_per_post() {
    let fixture = fixture(None).await;
    let context = context_for(AdminRole::SuperAdmin);

    for multiplier in [2.5, 0.8] {
        let result = fixture
            .service
            .handle(
                &context,
                PostAction::SetTrending {
                    post_id: "post-1".to_owned(),
                    multiplier,
                    exclude_from_trending: false,
                    note: None,
                },
            )
            .await;
        assert!(result.is_ok());
    }

    let overrides = fixture.store.overrides.lock().await;
    assert_eq!(overrides.len(), 1);
    assert_eq!(
        overrides.get("post-1").map(|row| row["trending_multiplier"].clone()),
        Some(json!(0.8))
    );

    let events = fixture.audit.events.lock().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].before_json, None);
    assert!(events[1].before_json.is_some());
}

#[tokio::test]
async fn trending_multiplier_above_ten_is_rejected() {
    let fixture = fixture(None).await;

    let result = fixture
        .service
        .handle(
            &context_for(AdminRole::SuperAdmin),
            PostAction::SetTrending {
                post_id: "post-1".to_owned(),
                multiplier: 10.01,
                exclude_from_trending: false,
                note: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(fixture.store.overrides.lock().await.is_empty());
}

#[tokio::test]
async fn removing_missing_post_leaves_no_audit_entry() {
    let fixture = fixture(None).await;

    let result = fixture
        .service
        .handle(
            &context_for(AdminRole::Moderator),
            PostAction::Remove {
                post_id: "post-404".to_owned(),
                reason: Some("Spam".to_owned()),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(fixture.audit.events.lock().await.is_empty());
}

#[tokio::test]
async fn audit_failure_after_removal_surfaces_store_error() {
    let store = Arc::new(FakeContentStore::default());
    store.posts.lock().await.insert(
        "post-1".to_owned(),
        json!({ "id": "post-1", "body": "buy followers", "deleted_at": null }),
    );
    let service = PostAdminService::new(
        store.clone(),
        store.clone(),
        AuditRecorder::new(Arc::new(FailingAuditRepository)),
    );

    let result = service
        .handle(&context_for(AdminRole::Moderator), remove("Spam"))
        .await;
    assert!(matches!(result, Err(AppError::Store(_))));

    let posts = store.posts.lock().await;
    assert!(matches!(posts.get("post-1"), Some(post) if post["deleted_at"].is_string()));
    assert!(store.moderation.lock().await.contains_key("post-1"));
}
