use std::sync::Arc;

use agora_core::{AppError, AppResult, Principal};

use crate::IdentityProvider;

/// Turns inbound bearer credentials into principals.
#[derive(Clone)]
pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
}

impl IdentityResolver {
    /// Creates a resolver backed by an identity provider.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Authenticates a request. Any provider failure is reported as `Unauthorized`.
    pub async fn authenticate(&self, bearer_token: Option<&str>) -> AppResult<Principal> {
        let token = bearer_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized("missing authorization bearer token".to_owned())
            })?;

        self.provider.resolve_bearer(token).await.map_err(|error| {
            tracing::debug!(error = %error, "bearer token rejected");
            AppError::Unauthorized("invalid token".to_owned())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use agora_core::{AppError, AppResult, Principal, PrincipalId};

    use super::IdentityResolver;
    use crate::IdentityProvider;

    struct FakeIdentityProvider {
        principal: Principal,
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentityProvider {
        async fn resolve_bearer(&self, token: &str) -> AppResult<Principal> {
            match token {
                "valid" => Ok(self.principal.clone()),
                "broken" => Err(AppError::Store("provider unavailable".to_owned())),
                _ => Err(AppError::Unauthorized("unknown token".to_owned())),
            }
        }

        async fn list_principals(&self, _page: u32, _per_page: u32) -> AppResult<Vec<Principal>> {
            Ok(Vec::new())
        }
    }

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(Arc::new(FakeIdentityProvider {
            principal: Principal::new(PrincipalId::new(), Some("mod@example.com".to_owned())),
        }))
    }

    #[tokio::test]
    async fn missing_or_blank_token_is_unauthorized() {
        let resolver = resolver();
        assert!(matches!(
            resolver.authenticate(None).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            resolver.authenticate(Some("  ")).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn provider_failures_become_unauthorized() {
        let result = resolver().authenticate(Some("broken")).await;
        assert!(matches!(result, Err(AppError::Unauthorized(message)) if message == "invalid token"));
    }

    #[tokio::test]
    async fn valid_token_resolves_principal() {
        let result = resolver().authenticate(Some("valid")).await;
        assert!(matches!(result, Ok(principal) if principal.email() == Some("mod@example.com")));
    }
}
