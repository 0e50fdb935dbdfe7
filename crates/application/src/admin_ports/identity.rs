use async_trait::async_trait;

use agora_core::{AppResult, Principal};

/// Port to the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a bearer token to the principal it was issued for.
    async fn resolve_bearer(&self, token: &str) -> AppResult<Principal>;

    /// Lists one page of registered principals, 1-based.
    async fn list_principals(&self, page: u32, per_page: u32) -> AppResult<Vec<Principal>>;
}
