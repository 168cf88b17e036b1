//! Token file mounted by the hosting platform (Kubernetes service account)

use crate::provider::TokenProvider;
use async_trait::async_trait;
use dbkey_core::{Error, IdentityToken, Result, WorkloadIdentity};
use std::path::{Path, PathBuf};
use tracing::{info, trace};

const STRATEGY: &str = "mounted";

/// Default Kubernetes projected service-account token location
pub const DEFAULT_TOKEN_PATH: &str = "/run/secrets/kubernetes.io/serviceaccount/token";

/// Reads the token the platform keeps refreshed on disk. No network call.
///
/// The workload identity is only used for logging; the platform decides
/// which identity the mounted token carries.
#[derive(Debug, Clone)]
pub struct MountedTokenProvider {
    token_path: PathBuf,
}

impl MountedTokenProvider {
    pub fn new(token_path: impl Into<PathBuf>) -> Self {
        Self {
            token_path: token_path.into(),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }
}

impl Default for MountedTokenProvider {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_PATH)
    }
}

#[async_trait]
impl TokenProvider for MountedTokenProvider {
    fn strategy(&self) -> &'static str {
        STRATEGY
    }

    async fn fetch_token(&self, workload: &WorkloadIdentity) -> Result<IdentityToken> {
        info!(token_path = ?self.token_path, workload = %workload, "IDP is K8s cluster");

        let bytes = tokio::fs::read(&self.token_path).await.map_err(|e| {
            Error::token_fetch(
                STRATEGY,
                format!("failed to read token file {:?}: {}", self.token_path, e),
            )
        })?;

        let jwt = String::from_utf8(bytes).map_err(|_| {
            Error::token_fetch(
                STRATEGY,
                format!("token file {:?} is not valid UTF-8", self.token_path),
            )
        })?;

        if jwt.trim().is_empty() {
            return Err(Error::token_fetch(
                STRATEGY,
                format!("token file {:?} is empty", self.token_path),
            ));
        }

        trace!(jwt = %jwt, "JWT");
        Ok(IdentityToken::new(jwt))
    }
}
