mod cors;

use agora_core::AppError;
use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(app_state: AppState, cors_allow_origin: &str) -> Result<Router, AppError> {
    let cors_layer = cors::build_cors_layer(cors_allow_origin)?;

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route(
            "/functions/v1/{function}",
            post(handlers::admin::admin_function_handler)
                .fallback(handlers::admin::method_not_allowed_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state))
}

#[cfg(test)]
mod tests;
