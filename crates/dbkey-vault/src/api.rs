//! The vault collaborator interface

use async_trait::async_trait;
use dbkey_core::{IdentityToken, SecretFailure, SecretValue, WorkloadIdentity};
use std::fmt;

/// Everything the vault needs to authenticate a workload
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    pub namespace: &'a str,
    pub auth_method_id: &'a str,
    pub workload: &'a WorkloadIdentity,
    pub token: &'a IdentityToken,
}

/// Short-lived credential returned by a successful vault authentication
#[derive(Clone)]
pub struct VaultSession {
    namespace: String,
    token: SecretValue,
}

impl VaultSession {
    pub fn new(namespace: impl Into<String>, token: impl Into<SecretValue>) -> Self {
        Self {
            namespace: namespace.into(),
            token: token.into(),
        }
    }

    /// Namespace the session was issued for
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn token(&self) -> &SecretValue {
        &self.token
    }
}

impl fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultSession")
            .field("namespace", &self.namespace)
            .field("token", &self.token)
            .finish()
    }
}

/// Authentication and lookup API of a secrets vault.
///
/// The wire protocol belongs to the vault; [`crate::ConjurClient`] speaks it
/// over HTTP. Failures are reported as [`SecretFailure`] and must not embed
/// the presented token or any secret value.
#[async_trait]
pub trait VaultApi: Send + Sync {
    /// Exchange an identity token for a vault session
    async fn authenticate(
        &self,
        request: AuthRequest<'_>,
    ) -> std::result::Result<VaultSession, SecretFailure>;

    /// Read the secret stored at `path`
    async fn fetch_secret(
        &self,
        session: &VaultSession,
        path: &str,
    ) -> std::result::Result<SecretValue, SecretFailure>;
}
