use std::collections::HashMap;
use std::sync::Arc;

use agora_application::AdminEndpoint;
use agora_core::AppError;
use sqlx::PgPool;

/// Prefix of every admin function name, as in `admin-users`.
const FUNCTION_PREFIX: &str = "admin-";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    endpoints: Arc<HashMap<&'static str, Arc<dyn AdminEndpoint>>>,
    pub postgres_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(endpoints: Vec<Arc<dyn AdminEndpoint>>, postgres_pool: Option<PgPool>) -> Self {
        Self {
            endpoints: Arc::new(
                endpoints
                    .into_iter()
                    .map(|endpoint| (endpoint.area(), endpoint))
                    .collect(),
            ),
            postgres_pool,
        }
    }

    /// Resolves a function name such as `admin-posts` to its area endpoint.
    pub fn endpoint(&self, function: &str) -> Result<Arc<dyn AdminEndpoint>, AppError> {
        function
            .strip_prefix(FUNCTION_PREFIX)
            .and_then(|area| self.endpoints.get(area))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("unknown admin function '{function}'")))
    }
}
