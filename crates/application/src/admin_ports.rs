mod audit;
mod content;
mod identity;
mod operations;
mod platform;
mod roles;

pub use audit::{AuditEvent, AuditLogEntry, AuditLogRepository, AuditRepository};
pub use content::{
    PostListQuery, PostRemoval, PostRepository, PostRestoration, PostStatusFilter,
    ProfileRepository, ProfileLock, ReportRepository, ReportReview, TrendingOverride,
    UserBoost, VerificationUpdate,
};
pub use identity::IdentityProvider;
pub use operations::{
    NewPlan, PlanPatch, PlanRepository, SettingEntry, SettingsRepository, StorageGateway,
};
pub use platform::{
    AnalyticsRepository, BroadcastRecord, BroadcastRepository, MessageRepository, NewBroadcast,
    PlatformStats,
};
pub use roles::{AdminAssignmentPatch, AdminListing, AdminRoleRepository};
