//! Build the configured token provider

use crate::local_idp::LocalIdpTokenProvider;
use crate::mounted::MountedTokenProvider;
use crate::provider::TokenProvider;
use dbkey_core::{IdentityConfig, Result};
use std::sync::Arc;
use std::time::Duration;

/// Create the single token provider selected by `config`
pub fn provider_from_config(config: &IdentityConfig) -> Result<Arc<dyn TokenProvider>> {
    let provider: Arc<dyn TokenProvider> = match config {
        IdentityConfig::LocalIdp {
            token_url,
            timeout_secs,
        } => Arc::new(LocalIdpTokenProvider::with_timeout(
            token_url.clone(),
            Duration::from_secs(*timeout_secs),
        )?),
        IdentityConfig::Mounted { token_path } => {
            Arc::new(MountedTokenProvider::new(token_path.clone()))
        }
    };

    tracing::debug!(strategy = provider.strategy(), "Token provider configured");
    Ok(provider)
}
