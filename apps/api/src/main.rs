//! Agora admin API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dev_seed;
mod dto;
mod error;
mod handlers;
mod state;

use std::sync::Arc;

use agora_core::AppError;
use agora_infrastructure::InMemoryAdminStore;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, StoreConfig, init_tracing};
use crate::api_services::{AdminPorts, build_app_state, connect_pool, run_migrations};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let app_state = match &config.store {
        StoreConfig::Postgres(store_config) => {
            let pool =
                connect_pool(&store_config.database_url, store_config.max_connections).await?;
            run_migrations(&pool).await?;

            if config.migrate_only {
                info!("database migrations applied successfully");
                return Ok(());
            }

            build_app_state(
                AdminPorts::postgres(pool.clone(), store_config),
                Some(pool),
            )
        }
        StoreConfig::InMemory { dev_admin_token } => {
            warn!("running with the in-memory admin store; data is lost on exit");
            let store = Arc::new(InMemoryAdminStore::new());
            if let Some(token) = dev_admin_token {
                dev_seed::run(&store, token).await?;
            }

            build_app_state(AdminPorts::in_memory(store), None)
        }
    };

    let app = api_router::build_router(app_state, &config.cors_allow_origin)?;
    let address = config.socket_address()?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "agora-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
