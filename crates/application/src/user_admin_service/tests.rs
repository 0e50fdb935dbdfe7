use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use agora_core::{AppError, AppResult, PrincipalId};
use agora_domain::{AdminRole, BanDuration, ProfileEdits, SECONDS_PER_DAY, VerificationType};

use crate::test_support::{RecordingAuditRepository, context_for};
use crate::{
    ActionHandler, AuditRecorder, ProfileLock, ProfileRepository, UserBoost, VerificationUpdate,
};

use super::{UserAction, UserAdminService};

#[derive(Default)]
struct FakeProfileRepository {
    profiles: Mutex<HashMap<PrincipalId, Value>>,
    locks: Mutex<Vec<ProfileLock>>,
    boosts: Mutex<Vec<UserBoost>>,
    verifications: Mutex<Vec<VerificationUpdate>>,
}

impl FakeProfileRepository {
    async fn require(&self, user_id: PrincipalId) -> AppResult<()> {
        if self.profiles.lock().await.contains_key(&user_id) {
            return Ok(());
        }
        Err(AppError::NotFound(format!("profile '{user_id}' not found")))
    }
}

#[async_trait]
impl ProfileRepository for FakeProfileRepository {
    async fn snapshot_profile(&self, user_id: PrincipalId) -> AppResult<Option<Value>> {
        Ok(self.profiles.lock().await.get(&user_id).cloned())
    }

    async fn set_verification(
        &self,
        user_id: PrincipalId,
        update: VerificationUpdate,
    ) -> AppResult<()> {
        self.require(user_id).await?;
        self.verifications.lock().await.push(update);
        Ok(())
    }

    async fn lock_profile(&self, user_id: PrincipalId, lock: ProfileLock) -> AppResult<()> {
        self.require(user_id).await?;
        self.locks.lock().await.push(lock);
        Ok(())
    }

    async fn unlock_profile(&self, user_id: PrincipalId) -> AppResult<()> {
        self.require(user_id).await
    }

    async fn set_boost(&self, user_id: PrincipalId, boost: UserBoost) -> AppResult<()> {
        self.require(user_id).await?;
        self.boosts.lock().await.push(boost);
        Ok(())
    }

    async fn apply_profile_edits(
        &self,
        user_id: PrincipalId,
        _edits: &ProfileEdits,
    ) -> AppResult<()> {
        self.require(user_id).await
    }
}

struct Fixture {
    service: UserAdminService,
    profiles: Arc<FakeProfileRepository>,
    audit: Arc<RecordingAuditRepository>,
    user_id: PrincipalId,
}

async fn fixture() -> Fixture {
    let profiles = Arc::new(FakeProfileRepository::default());
    let audit = Arc::new(RecordingAuditRepository::default());
    let user_id = PrincipalId::new();
    profiles
        .profiles
        .lock()
        .await
        .insert(user_id, json!({ "id": user_id, "handle": "learner", "is_locked": false }));

    Fixture {
        service: UserAdminService::new(profiles.clone(), AuditRecorder::new(audit.clone())),
        profiles,
        audit,
        user_id,
    }
}

fn parse(value: Value) -> UserAction {
    let Ok(action) = serde_json::from_value(value) else {
        panic!("fixture action should parse");
    };
    action
}

#[tokio::test]
async fn permanent_lock_has_no_expiry_and_is_audited() {
    let fixture = fixture().await;
    let context = context_for(AdminRole::Moderator);

    let result = fixture
        .service
        .handle(
            &context,
            UserAction::LockUser {
                user_id: fixture.user_id,
                ban_duration: BanDuration::Permanent,
                reason: Some("  repeated spam ".to_owned()),
            },
        )
        .await;
    assert!(result.is_ok());

    let locks = fixture.profiles.locks.lock().await;
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].locked_until, None);
    assert_eq!(locks[0].reason.as_str(), "repeated spam");

    let events = fixture.audit.events.lock().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "lock-user");
    assert_eq!(events[0].target_id, Some(fixture.user_id.to_string()));
    assert!(events[0].before_json.is_some());
}

#[tokio::test]
async fn thirty_day_lock_expires_thirty_days_later() {
    let fixture = fixture().await;
    let issued_at = Utc::now();

    let result = fixture
        .service
        .handle(
            &context_for(AdminRole::Moderator),
            parse(json!({
                "action": "lock-user",
                "userId": fixture.user_id,
                "banDuration": "30d",
                "reason": "harassment",
            })),
        )
        .await;
    assert!(result.is_ok());

    let locks = fixture.profiles.locks.lock().await;
    let Some(locked_until) = locks.first().and_then(|lock| lock.locked_until) else {
        panic!("timed lock should carry an expiry");
    };
    let expected = issued_at + Duration::seconds(30 * SECONDS_PER_DAY);
    assert!((locked_until - expected).num_seconds().abs() <= 1);
}

#[tokio::test]
async fn lock_without_reason_has_no_side_effects() {
    let fixture = fixture().await;

    let result = fixture
        .service
        .handle(
            &context_for(AdminRole::Moderator),
            UserAction::LockUser {
                user_id: fixture.user_id,
                ban_duration: BanDuration::Days7,
                reason: Some("   ".to_owned()),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(fixture.profiles.locks.lock().await.is_empty());
    assert!(fixture.audit.events.lock().await.is_empty());
}

#[tokio::test]
async fn boost_multiplier_range_is_enforced() {
    let fixture = fixture().await;
    let context = context_for(AdminRole::Moderator);

    for rejected in [0.0, -1.0, 5.01] {
        let result = fixture
            .service
            .handle(
                &context,
                parse(json!({
                    "action": "set-boost",
                    "userId": fixture.user_id,
                    "multiplier": rejected,
                    "duration": { "type": "permanent" },
                })),
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))), "{rejected}");
    }

    for accepted in [1.0, 5.0] {
        let result = fixture
            .service
            .handle(
                &context,
                parse(json!({
                    "action": "set-boost",
                    "userId": fixture.user_id,
                    "multiplier": accepted,
                    "duration": { "type": "preset", "preset": "7d" },
                })),
            )
            .await;
        assert!(result.is_ok(), "{accepted}");
    }

    assert_eq!(fixture.profiles.boosts.lock().await.len(), 2);
    assert_eq!(fixture.audit.actions().await, vec!["set-boost", "set-boost"]);
}

#[tokio::test]
async fn verification_requires_duration_unless_clearing() {
    let fixture = fixture().await;
    let context = context_for(AdminRole::Moderator);

    let missing = fixture
        .service
        .handle(
            &context,
            UserAction::SetVerification {
                user_id: fixture.user_id,
                verification_type: VerificationType::Creator,
                duration: None,
            },
        )
        .await;
    assert!(matches!(missing, Err(AppError::Validation(_))));

    let cleared = fixture
        .service
        .handle(
            &context,
            UserAction::SetVerification {
                user_id: fixture.user_id,
                verification_type: VerificationType::None,
                duration: None,
            },
        )
        .await;
    assert!(cleared.is_ok());

    let verifications = fixture.profiles.verifications.lock().await;
    assert_eq!(verifications.len(), 1);
    assert_eq!(verifications[0].verified_by, None);
    assert_eq!(verifications[0].verified_expires_at, None);
}

#[tokio::test]
async fn update_profile_rejects_protected_columns() {
    let fixture = fixture().await;

    let result = fixture
        .service
        .handle(
            &context_for(AdminRole::Moderator),
            parse(json!({
                "action": "update-profile",
                "userId": fixture.user_id,
                "updates": { "is_locked": false },
            })),
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(fixture.audit.events.lock().await.is_empty());
}

#[tokio::test]
async fn missing_profile_is_not_audited() {
    let fixture = fixture().await;

    let result = fixture
        .service
        .handle(
            &context_for(AdminRole::Moderator),
            UserAction::UnlockUser {
                user_id: PrincipalId::new(),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(fixture.audit.events.lock().await.is_empty());
}
