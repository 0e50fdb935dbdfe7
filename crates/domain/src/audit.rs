//! Audit tags and target kinds.

use std::borrow::Cow;

use agora_core::NonEmptyString;
use serde::{Deserialize, Serialize};

use crate::ReportStatus;

/// Kinds of resources privileged actions touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// Member profile.
    User,
    /// Feed post.
    Post,
    /// Subscription plan.
    Plan,
    /// Admin settings rows.
    AdminSettings,
    /// Storage bucket object.
    Storage,
    /// User report.
    Report,
    /// Broadcast notification.
    Broadcast,
    /// Private conversation.
    Conversation,
    /// Platform-wide access with no single target.
    System,
    /// Administrative role assignment.
    AdminUser,
}

impl TargetType {
    /// Returns a stable storage value for this target type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Post => "post",
            Self::Plan => "plan",
            Self::AdminSettings => "admin_settings",
            Self::Storage => "storage",
            Self::Report => "report",
            Self::Broadcast => "broadcast",
            Self::Conversation => "conversation",
            Self::System => "system",
            Self::AdminUser => "admin_user",
        }
    }
}

/// Stable audit tags written by privileged actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditAction {
    /// Verification badge changed.
    SetVerification,
    /// Account locked.
    LockUser,
    /// Account unlocked.
    UnlockUser,
    /// Reach boost changed.
    SetBoost,
    /// Profile columns edited.
    UpdateProfile,
    /// Post soft-deleted.
    RemovePost,
    /// Post restored.
    RestorePost,
    /// Trending override upserted.
    SetPostTrending,
    /// Plan created.
    CreatePlan,
    /// Plan updated.
    UpdatePlan,
    /// Plan deleted.
    DeletePlan,
    /// Settings upserted in bulk.
    UpdateSettings,
    /// Single storage object removed.
    DeleteFile,
    /// Several storage objects removed.
    DeleteFiles,
    /// Report moved to a new status.
    ReportStatusChanged(ReportStatus),
    /// Broadcast created.
    BroadcastCreated,
    /// Scheduled broadcast delivered.
    BroadcastSent,
    /// Conversation list viewed.
    DmListViewed,
    /// Conversation messages viewed.
    DmConversationViewed,
    /// Admin assignment created or replaced.
    AddAdmin,
    /// Admin assignment activated or deactivated.
    SetAdminActive,
    /// Admin DM access flag changed.
    SetAdminDmAccess,
    /// Admin role changed.
    SetAdminRole,
    /// Event declared by an admin client.
    Custom(NonEmptyString),
}

impl AuditAction {
    /// Returns the stored action tag.
    #[must_use]
    pub fn as_tag(&self) -> Cow<'_, str> {
        let tag = match self {
            Self::SetVerification => "set-verification",
            Self::LockUser => "lock-user",
            Self::UnlockUser => "unlock-user",
            Self::SetBoost => "set-boost",
            Self::UpdateProfile => "update-profile",
            Self::RemovePost => "remove-post",
            Self::RestorePost => "restore-post",
            Self::SetPostTrending => "set-post-trending",
            Self::CreatePlan => "create-plan",
            Self::UpdatePlan => "update-plan",
            Self::DeletePlan => "delete-plan",
            Self::UpdateSettings => "update-settings",
            Self::DeleteFile => "delete-file",
            Self::DeleteFiles => "delete-files",
            Self::ReportStatusChanged(status) => {
                return Cow::Owned(format!("report_{}", status.as_str()));
            }
            Self::BroadcastCreated => "broadcast_created",
            Self::BroadcastSent => "broadcast_sent",
            Self::DmListViewed => "dm_list_viewed",
            Self::DmConversationViewed => "dm_conversation_viewed",
            Self::AddAdmin => "add-admin",
            Self::SetAdminActive => "set-admin-active",
            Self::SetAdminDmAccess => "set-admin-dm-access",
            Self::SetAdminRole => "set-admin-role",
            Self::Custom(name) => return Cow::Borrowed(name.as_str()),
        };

        Cow::Borrowed(tag)
    }
}

#[cfg(test)]
mod tests {
    use agora_core::NonEmptyString;

    use super::{AuditAction, TargetType};
    use crate::ReportStatus;

    #[test]
    fn report_tags_embed_the_status() {
        let action = AuditAction::ReportStatusChanged(ReportStatus::Dismissed);
        assert_eq!(action.as_tag(), "report_dismissed");
    }

    #[test]
    fn custom_tags_pass_through() {
        let Ok(name) = NonEmptyString::new("report_warn_user") else {
            panic!("fixture name should be valid");
        };
        assert_eq!(AuditAction::Custom(name).as_tag(), "report_warn_user");
    }

    #[test]
    fn target_types_use_snake_case_storage_values() {
        assert_eq!(TargetType::AdminUser.as_str(), "admin_user");
        assert_eq!(TargetType::AdminSettings.as_str(), "admin_settings");
    }
}
