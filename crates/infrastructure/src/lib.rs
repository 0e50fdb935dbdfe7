//! Infrastructure adapters for the admin action ports.

#![forbid(unsafe_code)]

mod http_identity_provider;
mod http_storage_gateway;
mod in_memory_admin_store;
mod postgres_admin_role_repository;
mod postgres_analytics_repository;
mod postgres_audit_log_repository;
mod postgres_audit_repository;
mod postgres_broadcast_repository;
mod postgres_message_repository;
mod postgres_plan_repository;
mod postgres_post_repository;
mod postgres_profile_repository;
mod postgres_report_repository;
mod postgres_settings_repository;
mod row_id;

pub use http_identity_provider::HttpIdentityProvider;
pub use http_storage_gateway::HttpStorageGateway;
pub use in_memory_admin_store::InMemoryAdminStore;
pub use postgres_admin_role_repository::PostgresAdminRoleRepository;
pub use postgres_analytics_repository::PostgresAnalyticsRepository;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_broadcast_repository::PostgresBroadcastRepository;
pub use postgres_message_repository::PostgresMessageRepository;
pub use postgres_plan_repository::PostgresPlanRepository;
pub use postgres_post_repository::PostgresPostRepository;
pub use postgres_profile_repository::PostgresProfileRepository;
pub use postgres_report_repository::PostgresReportRepository;
pub use postgres_settings_repository::PostgresSettingsRepository;
