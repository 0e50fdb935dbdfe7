use std::sync::Arc;

use agora_application::{
    ActionHandler, ActionRouter, AdminEndpoint, AdminRoleRepository, AdminUserService,
    AnalyticsRepository, AnalyticsService, AuditLogRepository, AuditLogService, AuditRecorder,
    AuditRepository, AuthorizationService, BroadcastAdminService, BroadcastRepository,
    IdentityProvider, IdentityResolver, MessageOversightService, MessageRepository,
    PlanAdminService, PlanRepository, PostAdminService, PostRepository, ProfileRepository,
    ReportAdminService, ReportRepository, SettingsAdminService, SettingsRepository,
    StorageAdminService, StorageGateway, UserAdminService,
};
use agora_infrastructure::{
    HttpIdentityProvider, HttpStorageGateway, InMemoryAdminStore, PostgresAdminRoleRepository,
    PostgresAnalyticsRepository, PostgresAuditLogRepository, PostgresAuditRepository,
    PostgresBroadcastRepository, PostgresMessageRepository, PostgresPlanRepository,
    PostgresPostRepository, PostgresProfileRepository, PostgresReportRepository,
    PostgresSettingsRepository,
};
use sqlx::PgPool;

use crate::api_config::PostgresStoreConfig;
use crate::state::AppState;

/// Every collaborator the admin services depend on.
#[derive(Clone)]
pub struct AdminPorts {
    pub identity: Arc<dyn IdentityProvider>,
    pub roles: Arc<dyn AdminRoleRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub audit_log: Arc<dyn AuditLogRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub storage: Arc<dyn StorageGateway>,
    pub broadcasts: Arc<dyn BroadcastRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub analytics: Arc<dyn AnalyticsRepository>,
}

impl AdminPorts {
    pub fn postgres(pool: PgPool, config: &PostgresStoreConfig) -> Self {
        let http_client = reqwest::Client::new();

        Self {
            identity: Arc::new(HttpIdentityProvider::new(
                http_client.clone(),
                config.identity_provider_url.as_str(),
                config.service_role_key.as_str(),
            )),
            roles: Arc::new(PostgresAdminRoleRepository::new(pool.clone())),
            audit: Arc::new(PostgresAuditRepository::new(pool.clone())),
            audit_log: Arc::new(PostgresAuditLogRepository::new(pool.clone())),
            profiles: Arc::new(PostgresProfileRepository::new(pool.clone())),
            posts: Arc::new(PostgresPostRepository::new(pool.clone())),
            reports: Arc::new(PostgresReportRepository::new(pool.clone())),
            plans: Arc::new(PostgresPlanRepository::new(pool.clone())),
            settings: Arc::new(PostgresSettingsRepository::new(pool.clone())),
            storage: Arc::new(HttpStorageGateway::new(
                http_client,
                config.identity_provider_url.as_str(),
                config.service_role_key.as_str(),
            )),
            broadcasts: Arc::new(PostgresBroadcastRepository::new(pool.clone())),
            messages: Arc::new(PostgresMessageRepository::new(pool.clone())),
            analytics: Arc::new(PostgresAnalyticsRepository::new(pool)),
        }
    }

    pub fn in_memory(store: Arc<InMemoryAdminStore>) -> Self {
        Self {
            identity: store.clone(),
            roles: store.clone(),
            audit: store.clone(),
            audit_log: store.clone(),
            profiles: store.clone(),
            posts: store.clone(),
            reports: store.clone(),
            plans: store.clone(),
            settings: store.clone(),
            storage: store.clone(),
            broadcasts: store.clone(),
            messages: store.clone(),
            analytics: store,
        }
    }

    fn endpoints(self) -> Vec<Arc<dyn AdminEndpoint>> {
        let identity = IdentityResolver::new(self.identity.clone());
        let authorization = AuthorizationService::new(self.roles.clone());
        let recorder = AuditRecorder::new(self.audit.clone());
        let gate = (&identity, &authorization);

        vec![
            endpoint(gate, UserAdminService::new(self.profiles, recorder.clone())),
            endpoint(
                gate,
                PostAdminService::new(self.posts, self.settings.clone(), recorder.clone()),
            ),
            endpoint(gate, PlanAdminService::new(self.plans, recorder.clone())),
            endpoint(gate, StorageAdminService::new(self.storage, recorder.clone())),
            endpoint(gate, SettingsAdminService::new(self.settings, recorder.clone())),
            endpoint(gate, ReportAdminService::new(self.reports, recorder.clone())),
            endpoint(gate, MessageOversightService::new(self.messages, recorder.clone())),
            endpoint(gate, BroadcastAdminService::new(self.broadcasts, recorder.clone())),
            endpoint(gate, AnalyticsService::new(self.analytics)),
            endpoint(gate, AuditLogService::new(self.audit_log, recorder.clone())),
            endpoint(gate, AdminUserService::new(self.roles, self.identity, recorder)),
        ]
    }
}

fn endpoint<H: ActionHandler + 'static>(
    (identity, authorization): (&IdentityResolver, &AuthorizationService),
    handler: H,
) -> Arc<dyn AdminEndpoint> {
    Arc::new(ActionRouter::new(identity.clone(), authorization.clone(), handler))
}

pub fn build_app_state(ports: AdminPorts, postgres_pool: Option<PgPool>) -> AppState {
    AppState::new(ports.endpoints(), postgres_pool)
}
