//! HTTP client for a Conjur-style secrets manager using JWT authentication.
//!
//! Authentication:
//! `POST {base}/authn-jwt/{authenticator}/{account}/{host id}/authenticate`
//! with form body `jwt=<token>` and `Accept-Encoding: base64`. The response
//! body is the base64 session token.
//!
//! Lookup:
//! `GET {base}/secrets/{account}/variable/{path}` with
//! `Authorization: Token token="<session token>"`. The response body is the
//! plaintext value.

use crate::api::{AuthRequest, VaultApi, VaultSession};
use async_trait::async_trait;
use dbkey_core::config::namespace_base_url;
use dbkey_core::{Error, Result, SecretFailure, SecretValue, VaultConfig};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT_ENCODING, AUTHORIZATION};
use std::time::Duration;
use tracing::debug;

/// Vault API client.
///
/// Holds no session state; every [`VaultApi::authenticate`] call produces a
/// new session.
#[derive(Debug, Clone)]
pub struct ConjurClient {
    client: reqwest::Client,
    base_url: Option<String>,
    account: String,
    host_prefix: String,
}

impl ConjurClient {
    /// Create a client from vault configuration
    pub fn new(config: &VaultConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            account: config.account.clone(),
            host_prefix: config.host_prefix.clone(),
        })
    }

    /// Send every request to `base_url` instead of the namespace URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn base_url(&self, namespace: &str) -> String {
        match &self.base_url {
            Some(url) => url.clone(),
            None => namespace_base_url(namespace),
        }
    }

    /// Vault host id for a workload, e.g. `host/ai-agent`
    pub fn host_id(&self, workload: &str) -> String {
        format!("{}{}", self.host_prefix, workload)
    }

    pub fn authenticate_url(&self, namespace: &str, auth_method_id: &str, workload: &str) -> String {
        format!(
            "{}/authn-jwt/{}/{}/{}/authenticate",
            self.base_url(namespace),
            urlencoding::encode(auth_method_id),
            urlencoding::encode(&self.account),
            urlencoding::encode(&self.host_id(workload)),
        )
    }

    pub fn secret_url(&self, namespace: &str, path: &str) -> String {
        format!(
            "{}/secrets/{}/variable/{}",
            self.base_url(namespace),
            urlencoding::encode(&self.account),
            urlencoding::encode(path),
        )
    }
}

#[async_trait]
impl VaultApi for ConjurClient {
    async fn authenticate(
        &self,
        request: AuthRequest<'_>,
    ) -> std::result::Result<VaultSession, SecretFailure> {
        let url = self.authenticate_url(
            request.namespace,
            request.auth_method_id,
            request.workload.as_str(),
        );
        debug!(
            auth_method_id = request.auth_method_id,
            host_id = %self.host_id(request.workload.as_str()),
            "Authenticating to vault"
        );

        let response = self
            .client
            .post(&url)
            .header(ACCEPT_ENCODING, "base64")
            .form(&[("jwt", request.token.expose_secret())])
            .send()
            .await
            .map_err(network_failure)?;

        let status = response.status();
        if !status.is_success() {
            return Err(authentication_failure(status));
        }

        let session_token = response.text().await.map_err(network_failure)?;
        let session_token = session_token.trim();
        if session_token.is_empty() {
            return Err(SecretFailure::MalformedResponse(
                "empty session token".to_string(),
            ));
        }

        Ok(VaultSession::new(request.namespace, session_token))
    }

    async fn fetch_secret(
        &self,
        session: &VaultSession,
        path: &str,
    ) -> std::result::Result<SecretValue, SecretFailure> {
        let url = self.secret_url(session.namespace(), path);
        debug!(path = %path, "Fetching secret from vault");

        let response = self
            .client
            .get(&url)
            .header(
                AUTHORIZATION,
                format!("Token token=\"{}\"", session.token().expose_secret()),
            )
            .send()
            .await
            .map_err(network_failure)?;

        let status = response.status();
        if !status.is_success() {
            return Err(lookup_failure(status));
        }

        let bytes = response.bytes().await.map_err(network_failure)?;
        let value = String::from_utf8(bytes.to_vec()).map_err(|_| {
            SecretFailure::MalformedResponse("secret value is not valid UTF-8".to_string())
        })?;
        if value.is_empty() {
            return Err(SecretFailure::MalformedResponse(
                "secret value is empty".to_string(),
            ));
        }

        Ok(SecretValue::new(value))
    }
}

fn network_failure(err: reqwest::Error) -> SecretFailure {
    SecretFailure::Network(err.without_url().to_string())
}

/// Map a non-success status from the authenticate endpoint
pub fn authentication_failure(status: StatusCode) -> SecretFailure {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SecretFailure::AuthenticationRejected {
            status: status.as_u16(),
        },
        _ => SecretFailure::UnexpectedStatus {
            status: status.as_u16(),
        },
    }
}

/// Map a non-success status from the secret lookup endpoint
pub fn lookup_failure(status: StatusCode) -> SecretFailure {
    match status {
        StatusCode::NOT_FOUND => SecretFailure::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SecretFailure::AccessDenied {
            status: status.as_u16(),
        },
        _ => SecretFailure::UnexpectedStatus {
            status: status.as_u16(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbkey_core::{DbkeyConfig, IdentityToken, WorkloadIdentity};

    const AUTH_PATH: &str = "/authn-jwt/agentic/conjur/host%2Fai-agent/authenticate";
    const USERNAME_PATH: &str =
        "/secrets/conjur/variable/data%2Fvault%2FJodyDemo%2FK8sSecrets-MySQL%2Fusername";

    fn client(base_url: &str) -> ConjurClient {
        ConjurClient::new(&DbkeyConfig::test_defaults().vault)
            .unwrap()
            .with_base_url(base_url)
    }

    #[test]
    fn test_urls_from_namespace() {
        let client = ConjurClient::new(&DbkeyConfig::test_defaults().vault).unwrap();

        assert_eq!(
            client.authenticate_url("cybr-secrets", "agentic", "ai-agent"),
            "https://cybr-secrets.secretsmgr.cyberark.cloud/api/authn-jwt/agentic/conjur/host%2Fai-agent/authenticate"
        );
        assert_eq!(
            client.secret_url("cybr-secrets", "data/vault/JodyDemo/K8sSecrets-MySQL/username"),
            format!("https://cybr-secrets.secretsmgr.cyberark.cloud/api{}", USERNAME_PATH)
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            authentication_failure(StatusCode::UNAUTHORIZED),
            SecretFailure::AuthenticationRejected { status: 401 }
        );
        assert_eq!(
            authentication_failure(StatusCode::BAD_GATEWAY),
            SecretFailure::UnexpectedStatus { status: 502 }
        );
        assert_eq!(lookup_failure(StatusCode::NOT_FOUND), SecretFailure::NotFound);
        assert_eq!(
            lookup_failure(StatusCode::FORBIDDEN),
            SecretFailure::AccessDenied { status: 403 }
        );
    }

    #[tokio::test]
    async fn test_authenticate_and_fetch() {
        let mut server = mockito::Server::new_async().await;
        let auth = server
            .mock("POST", AUTH_PATH)
            .match_header("accept-encoding", "base64")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body("jwt=abc123")
            .with_status(200)
            .with_body("c2Vzc2lvbi10b2tlbg==")
            .create_async()
            .await;
        let secret = server
            .mock("GET", USERNAME_PATH)
            .match_header("authorization", "Token token=\"c2Vzc2lvbi10b2tlbg==\"")
            .with_status(200)
            .with_body("svc")
            .create_async()
            .await;

        let client = client(&server.url());
        let workload = WorkloadIdentity::new("ai-agent").unwrap();
        let token = IdentityToken::new("abc123");

        let session = client
            .authenticate(AuthRequest {
                namespace: "cybr-secrets",
                auth_method_id: "agentic",
                workload: &workload,
                token: &token,
            })
            .await
            .unwrap();
        assert_eq!(session.namespace(), "cybr-secrets");

        let value = client
            .fetch_secret(&session, "data/vault/JodyDemo/K8sSecrets-MySQL/username")
            .await
            .unwrap();
        assert_eq!(value.expose_secret(), "svc");

        auth.assert_async().await;
        secret.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _auth = server
            .mock("POST", AUTH_PATH)
            .with_status(401)
            .create_async()
            .await;

        let workload = WorkloadIdentity::new("ai-agent").unwrap();
        let token = IdentityToken::new("expired");
        let err = client(&server.url())
            .authenticate(AuthRequest {
                namespace: "cybr-secrets",
                auth_method_id: "agentic",
                workload: &workload,
                token: &token,
            })
            .await
            .unwrap_err();

        assert_eq!(err, SecretFailure::AuthenticationRejected { status: 401 });
        assert!(!err.to_string().contains("expired"));
    }

    #[tokio::test]
    async fn test_authenticate_empty_session_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _auth = server
            .mock("POST", AUTH_PATH)
            .with_status(200)
            .with_body("  ")
            .create_async()
            .await;

        let workload = WorkloadIdentity::new("ai-agent").unwrap();
        let token = IdentityToken::new("abc123");
        let err = client(&server.url())
            .authenticate(AuthRequest {
                namespace: "cybr-secrets",
                auth_method_id: "agentic",
                workload: &workload,
                token: &token,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SecretFailure::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_fetch_missing_secret() {
        let mut server = mockito::Server::new_async().await;
        let _secret = server
            .mock("GET", USERNAME_PATH)
            .with_status(404)
            .create_async()
            .await;

        let session = VaultSession::new("cybr-secrets", "c2Vzc2lvbi10b2tlbg==");
        let err = client(&server.url())
            .fetch_secret(&session, "data/vault/JodyDemo/K8sSecrets-MySQL/username")
            .await
            .unwrap_err();

        assert_eq!(err, SecretFailure::NotFound);
    }

    #[tokio::test]
    async fn test_vault_unreachable() {
        let session = VaultSession::new("cybr-secrets", "c2Vzc2lvbi10b2tlbg==");
        let err = client("http://127.0.0.1:9")
            .fetch_secret(&session, "data/vault/db/password")
            .await
            .unwrap_err();

        assert!(matches!(err, SecretFailure::Network(_)));
    }
}
