//! Application services and ports for the admin action plane.

#![forbid(unsafe_code)]

mod action_router;
mod admin_ports;
mod admin_user_service;
mod analytics_service;
mod audit_log_service;
mod audit_recorder;
mod authorization_service;
mod broadcast_admin_service;
mod identity_resolver;
mod message_oversight_service;
mod plan_admin_service;
mod post_admin_service;
mod report_admin_service;
mod settings_admin_service;
mod storage_admin_service;
mod user_admin_service;

#[cfg(test)]
mod test_support;

pub use action_router::{
    ActionContext, ActionHandler, ActionPolicy, ActionRequest, ActionRouter, AdminAction,
    AdminEndpoint, RequestMetadata, bounded_limit, ok_payload,
};
pub use admin_ports::{
    AdminAssignmentPatch, AdminListing, AdminRoleRepository, AnalyticsRepository, AuditEvent,
    AuditLogEntry, AuditLogRepository, AuditRepository, BroadcastRecord, BroadcastRepository,
    IdentityProvider, MessageRepository, NewBroadcast, NewPlan, PlanPatch, PlanRepository,
    PlatformStats, PostListQuery, PostRemoval, PostRepository, PostRestoration, PostStatusFilter,
    ProfileLock, ProfileRepository, ReportRepository, ReportReview, SettingEntry,
    SettingsRepository, StorageGateway, TrendingOverride, UserBoost, VerificationUpdate,
};
pub use admin_user_service::{
    AdminUserAction, AdminUserService, EMAIL_LOOKUP_MAX_PAGES, EMAIL_LOOKUP_PAGE_SIZE,
};
pub use analytics_service::{AnalyticsAction, AnalyticsService};
pub use audit_log_service::{AuditLogAction, AuditLogService};
pub use audit_recorder::{AuditRecord, AuditRecorder};
pub use authorization_service::AuthorizationService;
pub use broadcast_admin_service::{BroadcastAction, BroadcastAdminService};
pub use identity_resolver::IdentityResolver;
pub use message_oversight_service::{MessageAction, MessageOversightService};
pub use plan_admin_service::{PlanAction, PlanAdminService, PlanInput};
pub use post_admin_service::{PostAction, PostAdminService};
pub use report_admin_service::{ReportAction, ReportAdminService};
pub use settings_admin_service::{SettingInput, SettingsAction, SettingsAdminService};
pub use storage_admin_service::{STORAGE_LIST_LIMIT, StorageAction, StorageAdminService};
pub use user_admin_service::{UserAction, UserAdminService};
