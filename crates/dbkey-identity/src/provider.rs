//! The token provider seam

use async_trait::async_trait;
use dbkey_core::{IdentityToken, Result, WorkloadIdentity};

/// Produces a bearer token proving a workload's identity.
///
/// Implementations are interchangeable: the secret retriever only sees the
/// returned token, never how it was obtained. Every call fetches a fresh
/// token; implementations must not cache.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Strategy label for logs and errors, e.g. `local_idp`
    fn strategy(&self) -> &'static str;

    /// Fetch a token for `workload`
    ///
    /// # Errors
    ///
    /// Returns `Error::TokenFetch` if the provider is unreachable, the token
    /// source is missing, or the response does not contain a token.
    async fn fetch_token(&self, workload: &WorkloadIdentity) -> Result<IdentityToken>;
}

/// Always returns the same token. For local development and tests.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: IdentityToken,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: IdentityToken::new(token),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    fn strategy(&self) -> &'static str {
        "static"
    }

    async fn fetch_token(&self, workload: &WorkloadIdentity) -> Result<IdentityToken> {
        tracing::debug!(workload = %workload, "Using static identity token");
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_returns_fixed_token() {
        let provider = StaticTokenProvider::new("dev-token");
        let workload = WorkloadIdentity::new("ai-agent").unwrap();

        let token = provider.fetch_token(&workload).await.unwrap();
        assert_eq!(token.expose_secret(), "dev-token");
        assert_eq!(provider.strategy(), "static");
    }
}
