use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use agora_application::IdentityProvider;
use agora_core::{AppError, AppResult, Principal, PrincipalId};

/// Identity provider adapter speaking the platform's `/auth/v1` HTTP API.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    http_client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HttpIdentityProvider {
    /// Creates a provider for `base_url` authenticated with the service credential.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            service_key: service_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IdentityUser {
    id: String,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityUserPage {
    #[serde(default)]
    users: Vec<IdentityUser>,
}

impl TryFrom<IdentityUser> for Principal {
    type Error = AppError;

    fn try_from(user: IdentityUser) -> Result<Self, Self::Error> {
        let id = user.id.parse::<PrincipalId>().map_err(|error| {
            AppError::Store(format!("identity provider returned an invalid user id: {error}"))
        })?;

        Ok(Principal::new(id, user.email))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve_bearer(&self, token: &str) -> AppResult<Principal> {
        let response = self
            .http_client
            .get(format!("{}/auth/v1/user", self.base_url))
            .bearer_auth(token)
            .header("apikey", self.service_key.as_str())
            .send()
            .await
            .map_err(|error| {
                AppError::Store(format!("identity provider request failed: {error}"))
            })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AppError::Unauthorized("invalid token".to_owned()));
            }
            status => {
                return Err(AppError::Store(format!(
                    "identity provider returned status {status}"
                )));
            }
        }

        let user = response.json::<IdentityUser>().await.map_err(|error| {
            AppError::Store(format!("identity provider returned an invalid user: {error}"))
        })?;

        Principal::try_from(user)
    }

    async fn list_principals(&self, page: u32, per_page: u32) -> AppResult<Vec<Principal>> {
        let response = self
            .http_client
            .get(format!(
                "{}/auth/v1/admin/users?page={page}&per_page={per_page}",
                self.base_url
            ))
            .bearer_auth(self.service_key.as_str())
            .header("apikey", self.service_key.as_str())
            .send()
            .await
            .map_err(|error| {
                AppError::Store(format!("identity provider request failed: {error}"))
            })?
            .error_for_status()
            .map_err(|error| AppError::Store(format!("failed to list users: {error}")))?;

        let page = response.json::<IdentityUserPage>().await.map_err(|error| {
            AppError::Store(format!("identity provider returned an invalid user page: {error}"))
        })?;

        page.users.into_iter().map(Principal::try_from).collect()
    }
}
