use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use agora_core::{AppError, AppResult, NonEmptyString, PrincipalId};
use agora_domain::{
    AdminRole, AuditAction, BanDuration, BoostDuration, BoostMultiplier, ProfileEdits,
    TargetType, VerificationDuration, VerificationType,
};

use crate::{
    ActionContext, ActionHandler, ActionPolicy, AdminAction, AuditRecord, AuditRecorder,
    ProfileLock, ProfileRepository, UserBoost, VerificationUpdate, ok_payload,
};

/// Member moderation actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum UserAction {
    /// Grant or clear a verification badge.
    SetVerification {
        /// Member id.
        user_id: PrincipalId,
        /// Badge kind.
        verification_type: VerificationType,
        /// Badge lifetime, required unless clearing.
        #[serde(default)]
        duration: Option<VerificationDuration>,
    },
    /// Lock the account.
    LockUser {
        /// Member id.
        user_id: PrincipalId,
        /// Lock length.
        ban_duration: BanDuration,
        /// Reason shown to the member.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Unlock the account.
    UnlockUser {
        /// Member id.
        user_id: PrincipalId,
    },
    /// Set the reach boost.
    SetBoost {
        /// Member id.
        user_id: PrincipalId,
        /// Multiplier in `[1, 5]`.
        multiplier: f64,
        /// Boost lifetime.
        duration: BoostDuration,
    },
    /// Edit whitelisted profile columns.
    UpdateProfile {
        /// Member id.
        user_id: PrincipalId,
        /// Column edits.
        updates: Map<String, Value>,
    },
    /// Unrecognized tag.
    #[serde(other)]
    Unknown,
}

const USER_POLICIES: &[ActionPolicy] = &[
    ActionPolicy::new("set-verification", AdminRole::Moderator, TargetType::User),
    ActionPolicy::new("lock-user", AdminRole::Moderator, TargetType::User),
    ActionPolicy::new("unlock-user", AdminRole::Moderator, TargetType::User),
    ActionPolicy::new("set-boost", AdminRole::Moderator, TargetType::User),
    ActionPolicy::new("update-profile", AdminRole::Moderator, TargetType::User),
];

impl AdminAction for UserAction {
    fn policy(tag: &str) -> Option<ActionPolicy> {
        USER_POLICIES.iter().find(|policy| policy.name == tag).copied()
    }
}

/// Application service for member moderation.
#[derive(Clone)]
pub struct UserAdminService {
    profiles: Arc<dyn ProfileRepository>,
    audit: AuditRecorder,
}

impl UserAdminService {
    /// Creates the service.
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileRepository>, audit: AuditRecorder) -> Self {
        Self { profiles, audit }
    }

    async fn set_verification(
        &self,
        context: &ActionContext,
        user_id: PrincipalId,
        verification_type: VerificationType,
        duration: Option<VerificationDuration>,
    ) -> AppResult<Value> {
        let now = Utc::now();
        let update = if verification_type.is_verified() {
            let duration = duration
                .ok_or_else(|| AppError::Validation("duration is required".to_owned()))?;
            VerificationUpdate {
                verified_type: verification_type,
                verified_at: Some(now),
                verified_by: Some(context.actor_id()),
                verified_expires_at: duration.expires_at(now)?,
            }
        } else {
            VerificationUpdate {
                verified_type: verification_type,
                verified_at: None,
                verified_by: None,
                verified_expires_at: None,
            }
        };
        let after = json!({
            "verified_type": update.verified_type,
            "verified_expires_at": update.verified_expires_at,
        });

        let before = self.profiles.snapshot_profile(user_id).await?;
        self.profiles.set_verification(user_id, update).await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::SetVerification, TargetType::User)
                    .target_id(user_id.to_string())
                    .before(before)
                    .after(after),
            )
            .await?;

        Ok(ok_payload())
    }

    async fn lock_user(
        &self,
        context: &ActionContext,
        user_id: PrincipalId,
        ban_duration: BanDuration,
        reason: Option<String>,
    ) -> AppResult<Value> {
        let reason = NonEmptyString::required("reason", reason.unwrap_or_default())?;
        let now = Utc::now();
        let lock = ProfileLock {
            reason: reason.clone(),
            locked_at: now,
            locked_until: ban_duration.expires_at(now),
            locked_by: context.actor_id(),
        };
        let after = json!({ "reason": reason, "locked_until": lock.locked_until });

        let before = self.profiles.snapshot_profile(user_id).await?;
        self.profiles.lock_profile(user_id, lock).await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::LockUser, TargetType::User)
                    .target_id(user_id.to_string())
                    .before(before)
                    .after(after),
            )
            .await?;

        Ok(ok_payload())
    }

    async fn unlock_user(&self, context: &ActionContext, user_id: PrincipalId) -> AppResult<Value> {
        let before = self.profiles.snapshot_profile(user_id).await?;
        self.profiles.unlock_profile(user_id).await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::UnlockUser, TargetType::User)
                    .target_id(user_id.to_string())
                    .before(before)
                    .after(json!({ "is_locked": false })),
            )
            .await?;

        Ok(ok_payload())
    }

    async fn set_boost(
        &self,
        context: &ActionContext,
        user_id: PrincipalId,
        multiplier: f64,
        duration: BoostDuration,
    ) -> AppResult<Value> {
        let multiplier = BoostMultiplier::new(multiplier)?;
        let expires_at = duration.expires_at(Utc::now())?;
        let after = json!({
            "boost_multiplier": multiplier,
            "boost_expires_at": expires_at,
        });

        let before = self.profiles.snapshot_profile(user_id).await?;
        self.profiles
            .set_boost(
                user_id,
                UserBoost {
                    multiplier,
                    expires_at,
                    boosted_by: context.actor_id(),
                },
            )
            .await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::SetBoost, TargetType::User)
                    .target_id(user_id.to_string())
                    .before(before)
                    .after(after),
            )
            .await?;

        Ok(ok_payload())
    }

    async fn update_profile(
        &self,
        context: &ActionContext,
        user_id: PrincipalId,
        updates: &Map<String, Value>,
    ) -> AppResult<Value> {
        let edits = ProfileEdits::from_updates(updates)?;

        let before = self.profiles.snapshot_profile(user_id).await?;
        self.profiles.apply_profile_edits(user_id, &edits).await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::UpdateProfile, TargetType::User)
                    .target_id(user_id.to_string())
                    .before(before)
                    .after(edits.to_json()),
            )
            .await?;

        Ok(ok_payload())
    }
}

#[async_trait]
impl ActionHandler for UserAdminService {
    const AREA: &'static str = "users";
    type Action = UserAction;

    async fn handle(&self, context: &ActionContext, action: UserAction) -> AppResult<Value> {
        match action {
            UserAction::SetVerification {
                user_id,
                verification_type,
                duration,
            } => {
                self.set_verification(context, user_id, verification_type, duration)
                    .await
            }
            UserAction::LockUser {
                user_id,
                ban_duration,
                reason,
            } => self.lock_user(context, user_id, ban_duration, reason).await,
            UserAction::UnlockUser { user_id } => self.unlock_user(context, user_id).await,
            UserAction::SetBoost {
                user_id,
                multiplier,
                duration,
            } => self.set_boost(context, user_id, multiplier, duration).await,
            UserAction::UpdateProfile { user_id, updates } => {
                self.update_profile(context, user_id, &updates).await
            }
            UserAction::Unknown => Err(AppError::Validation("unknown action".to_owned())),
        }
    }
}

#[cfg(test)]
mod tests;
