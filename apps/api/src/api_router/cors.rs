use agora_core::AppError;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub(super) fn build_cors_layer(allow_origin: &str) -> Result<CorsLayer, AppError> {
    let origin = if allow_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        AllowOrigin::exact(HeaderValue::from_str(allow_origin.trim()).map_err(|error| {
            AppError::Internal(format!("invalid CORS_ALLOW_ORIGIN: {error}"))
        })?)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]))
}
