//! Domain rules of the admin control plane.

#![forbid(unsafe_code)]

mod audit;
mod broadcast;
mod durations;
mod moderation;
mod profile;
mod role;

pub use audit::{AuditAction, TargetType};
pub use broadcast::{BroadcastAudience, BroadcastStatus};
pub use durations::{
    BanDuration, BoostDuration, BoostPreset, MAX_BOOST_DAYS, MAX_VERIFICATION_DAYS,
    SECONDS_PER_DAY, VerificationDuration, VerificationPreset,
};
pub use moderation::{
    BoostMultiplier, DEFAULT_REMOVAL_REASON, MODERATION_POSTS_SETTING_KEY,
    ModerationPostSettings, ReportActionTaken, ReportStatus, TRENDING_SETTING_KEY,
    TrendingMultiplier, TrendingWeights,
};
pub use profile::{EditableProfileField, EmailAddress, ProfileEdits, VerificationType};
pub use role::{AdminRole, AdminRoleAssignment};
