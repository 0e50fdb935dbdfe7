use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use agora_core::AppError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PostgresStoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub identity_provider_url: String,
    pub service_role_key: String,
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Postgres(PostgresStoreConfig),
    InMemory { dev_admin_token: Option<String> },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub store: StoreConfig,
    pub api_host: String,
    pub api_port: u16,
    pub cors_allow_origin: String,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        let in_memory = env::var("DEV_IN_MEMORY_STORE")
            .unwrap_or_else(|_| "false".to_owned())
            .eq_ignore_ascii_case("true");

        let store = if in_memory {
            if migrate_only {
                return Err(AppError::Validation(
                    "migrate cannot run with DEV_IN_MEMORY_STORE=true".to_owned(),
                ));
            }

            StoreConfig::InMemory {
                dev_admin_token: env::var("DEV_ADMIN_TOKEN")
                    .ok()
                    .filter(|value| !value.trim().is_empty()),
            }
        } else {
            let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .map(|value| {
                    value.parse::<u32>().map_err(|error| {
                        AppError::Validation(format!("invalid DATABASE_MAX_CONNECTIONS: {error}"))
                    })
                })
                .transpose()?
                .unwrap_or(10);

            StoreConfig::Postgres(PostgresStoreConfig {
                database_url: required_env("DATABASE_URL")?,
                max_connections,
                identity_provider_url: required_non_empty_env("IDENTITY_PROVIDER_URL")?,
                service_role_key: required_non_empty_env("SERVICE_ROLE_KEY")?,
            })
        };

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);
        let cors_allow_origin = env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".to_owned());

        Ok(Self {
            migrate_only,
            store,
            api_host,
            api_port,
            cors_allow_origin,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}
