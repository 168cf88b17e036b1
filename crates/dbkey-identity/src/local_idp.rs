//! Token issuer reachable over HTTP (e.g. a jwt-this instance on localhost)

use crate::provider::TokenProvider;
use async_trait::async_trait;
use dbkey_core::{Error, IdentityToken, Result, WorkloadIdentity};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, trace};

const STRATEGY: &str = "local_idp";

/// Fetches tokens by POSTing `workload=<id>` to a token endpoint.
///
/// The endpoint answers with `{"access_token": "<jwt>"}`.
///
/// # Example
///
/// ```no_run
/// use dbkey_core::WorkloadIdentity;
/// use dbkey_identity::{LocalIdpTokenProvider, TokenProvider};
///
/// # async fn example() -> dbkey_core::Result<()> {
/// let provider = LocalIdpTokenProvider::new("http://localhost:8000/token")?;
/// let token = provider
///     .fetch_token(&WorkloadIdentity::new("ai-agent")?)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalIdpTokenProvider {
    client: reqwest::Client,
    token_url: String,
}

impl LocalIdpTokenProvider {
    /// Create a provider with the default 30s request timeout
    pub fn new(token_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(token_url, Duration::from_secs(30))
    }

    pub fn with_timeout(token_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token_url: token_url.into(),
        })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[async_trait]
impl TokenProvider for LocalIdpTokenProvider {
    fn strategy(&self) -> &'static str {
        STRATEGY
    }

    async fn fetch_token(&self, workload: &WorkloadIdentity) -> Result<IdentityToken> {
        info!(token_url = %self.token_url, workload = %workload, "IDP is local token issuer");

        let response = self
            .client
            .post(&self.token_url)
            .form(&[("workload", workload.as_str())])
            .send()
            .await
            .map_err(|e| {
                Error::token_fetch(STRATEGY, format!("request to token endpoint failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::token_fetch(
                STRATEGY,
                format!("token endpoint returned HTTP {}", status.as_u16()),
            ));
        }

        let body = response.text().await.map_err(|e| {
            Error::token_fetch(STRATEGY, format!("failed to read token response: {}", e))
        })?;

        let token = parse_token_response(&body)?;
        info!(workload = %workload, "JWT retrieved successfully");
        trace!(jwt = token.expose_secret(), "JWT");

        Ok(token)
    }
}

/// Extract `access_token` from a token endpoint response body
pub fn parse_token_response(body: &str) -> Result<IdentityToken> {
    if body.trim().is_empty() {
        return Err(Error::token_fetch(STRATEGY, "token endpoint returned an empty body"));
    }

    let parsed: Value = serde_json::from_str(body).map_err(|e| {
        Error::token_fetch(STRATEGY, format!("token response is not valid JSON: {}", e))
    })?;

    let object = match parsed.as_object() {
        Some(object) if !object.is_empty() => object,
        _ => {
            return Err(Error::token_fetch(
                STRATEGY,
                "token response is not a non-empty JSON object",
            ));
        }
    };

    match object.get("access_token").and_then(Value::as_str) {
        Some(token) if !token.is_empty() => Ok(IdentityToken::new(token)),
        Some(_) => Err(Error::token_fetch(STRATEGY, "access_token is empty")),
        None => Err(Error::token_fetch(
            STRATEGY,
            "token response has no string access_token field",
        )),
    }
}
