use agora_application::{ActionRequest, RequestMetadata};
use agora_core::AppError;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use serde_json::Value;

use crate::dto::DataResponse;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn admin_function_handler(
    State(state): State<AppState>,
    Path(function): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<DataResponse<Value>>> {
    let endpoint = state.endpoint(function.as_str())?;
    let request = ActionRequest {
        bearer_token: bearer_token(&headers),
        body: body.to_vec(),
        metadata: request_metadata(&headers),
    };

    let data = endpoint.dispatch(request).await?;
    Ok(Json(DataResponse { data }))
}

pub async fn method_not_allowed_handler() -> ApiError {
    AppError::MethodNotAllowed("method not allowed".to_owned()).into()
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = header_text(headers, AUTHORIZATION.as_str())?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim().to_owned())
}

fn request_metadata(headers: &HeaderMap) -> RequestMetadata {
    let forwarded_for = header_text(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    RequestMetadata {
        ip_address: forwarded_for
            .or_else(|| header_text(headers, "x-real-ip"))
            .map(str::to_owned),
        user_agent: header_text(headers, USER_AGENT.as_str()).map(str::to_owned),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};

    use super::{bearer_token, request_metadata};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn first_forwarded_address_wins_over_real_ip() {
        let metadata = request_metadata(&headers(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
            ("user-agent", "admin-panel"),
        ]));

        assert_eq!(metadata.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(metadata.user_agent.as_deref(), Some("admin-panel"));
    }

    #[test]
    fn real_ip_is_used_without_forwarded_for() {
        let metadata = request_metadata(&headers(&[("x-real-ip", "198.51.100.2")]));
        assert_eq!(metadata.ip_address.as_deref(), Some("198.51.100.2"));
        assert_eq!(metadata.user_agent, None);
    }

    #[test]
    fn only_bearer_credentials_are_extracted() {
        assert_eq!(
            bearer_token(&headers(&[("authorization", "Bearer abc")])).as_deref(),
            Some("abc")
        );
        assert_eq!(
            bearer_token(&headers(&[("authorization", "bearer abc")])).as_deref(),
            Some("abc")
        );
        assert_eq!(bearer_token(&headers(&[("authorization", "Basic abc")])), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
