//! Token-for-secret exchange

use crate::api::{AuthRequest, VaultApi};
use dbkey_core::{
    DatabaseCredentials, Error, Result, SecretValue, VaultConfig, WorkloadIdentity,
};
use dbkey_identity::TokenProvider;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Vault namespace and authenticator a retriever is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSettings {
    pub namespace: String,
    pub auth_method_id: String,
}

impl VaultSettings {
    pub fn new(namespace: impl Into<String>, auth_method_id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            auth_method_id: auth_method_id.into(),
        }
    }
}

impl From<&VaultConfig> for VaultSettings {
    fn from(config: &VaultConfig) -> Self {
        Self::new(config.namespace.clone(), config.auth_method_id.clone())
    }
}

/// One secret held by the vault, requested on behalf of a workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    pub path: String,
    pub workload: WorkloadIdentity,
}

impl SecretReference {
    pub fn new(path: impl Into<String>, workload: WorkloadIdentity) -> Self {
        Self {
            path: path.into(),
            workload,
        }
    }
}

/// Exchanges fresh identity tokens for vault secrets.
///
/// Construction only stores configuration. Each [`get_secret`](Self::get_secret)
/// call fetches a new token, authenticates, and reads one secret; nothing is
/// cached between calls.
///
/// # Example
///
/// ```no_run
/// use dbkey_core::{DbkeyConfig, WorkloadIdentity};
/// use dbkey_identity::LocalIdpTokenProvider;
/// use dbkey_vault::{ConjurClient, SecretReference, SecretRetriever, VaultSettings};
/// use std::sync::Arc;
///
/// # async fn example() -> dbkey_core::Result<()> {
/// let config = DbkeyConfig::test_defaults();
/// let retriever = SecretRetriever::new(
///     VaultSettings::new("cybr-secrets", "agentic"),
///     Arc::new(LocalIdpTokenProvider::new("http://localhost:8000/token")?),
///     Arc::new(ConjurClient::new(&config.vault)?),
/// );
///
/// let reference = SecretReference::new(
///     "data/vault/JodyDemo/K8sSecrets-MySQL/username",
///     WorkloadIdentity::new("ai-agent")?,
/// );
/// let username = retriever.get_secret(&reference).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SecretRetriever {
    settings: VaultSettings,
    tokens: Arc<dyn TokenProvider>,
    vault: Arc<dyn VaultApi>,
}

impl SecretRetriever {
    pub fn new(
        settings: VaultSettings,
        tokens: Arc<dyn TokenProvider>,
        vault: Arc<dyn VaultApi>,
    ) -> Self {
        Self {
            settings,
            tokens,
            vault,
        }
    }

    pub fn settings(&self) -> &VaultSettings {
        &self.settings
    }

    /// Fetch one secret.
    ///
    /// # Errors
    ///
    /// - `Error::TokenFetch` if no token could be obtained; the vault is not contacted
    /// - `Error::SecretRetrieval` if authentication or the lookup fails
    pub async fn get_secret(&self, reference: &SecretReference) -> Result<SecretValue> {
        let workload = &reference.workload;
        let token = self.tokens.fetch_token(workload).await?;
        debug!(
            strategy = self.tokens.strategy(),
            workload = %workload,
            "Identity token obtained"
        );

        let session = self
            .vault
            .authenticate(AuthRequest {
                namespace: &self.settings.namespace,
                auth_method_id: &self.settings.auth_method_id,
                workload,
                token: &token,
            })
            .await
            .map_err(|reason| {
                warn!(
                    path = %reference.path,
                    workload = %workload,
                    error = %reason,
                    "Vault authentication failed"
                );
                Error::secret_retrieval(reference.path.clone(), reason)
            })?;

        let value = self
            .vault
            .fetch_secret(&session, &reference.path)
            .await
            .map_err(|reason| {
                warn!(path = %reference.path, error = %reason, "Secret lookup failed");
                Error::secret_retrieval(reference.path.clone(), reason)
            })?;

        info!(path = %reference.path, workload = %workload, "Secret retrieved");
        Ok(value)
    }

    /// Fetch a username/password pair, stopping at the first failure
    pub async fn get_credentials(
        &self,
        username: &SecretReference,
        password: &SecretReference,
    ) -> Result<DatabaseCredentials> {
        let username = self.get_secret(username).await?;
        let password = self.get_secret(password).await?;
        Ok(DatabaseCredentials { username, password })
    }
}
