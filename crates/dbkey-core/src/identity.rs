//! Workload identity and the bearer token that proves it

use crate::secret::SecretValue;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the calling workload, e.g. `ai-agent`.
///
/// Scopes both token issuance and secret access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkloadIdentity(String);

impl WorkloadIdentity {
    /// Create a workload identity, rejecting blank names
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::config_error("workload identity must not be empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkloadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque bearer token issued for a workload.
///
/// Fetched fresh for every secret request and never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityToken(SecretValue);

impl IdentityToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretValue::new(token))
    }

    /// Raw token, for presenting to the vault. Never log it above TRACE.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentityToken([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workload_identity_rejects_blank() {
        assert!(WorkloadIdentity::new("").is_err());
        assert!(WorkloadIdentity::new("   ").is_err());

        let workload = WorkloadIdentity::new("ai-agent").unwrap();
        assert_eq!(workload.as_str(), "ai-agent");
        assert_eq!(workload.to_string(), "ai-agent");
    }

    #[test]
    fn test_identity_token_debug_is_redacted() {
        let token = IdentityToken::new("eyJhbGciOiJSUzI1NiJ9.payload.sig");
        assert_eq!(format!("{:?}", token), "IdentityToken([REDACTED])");
        assert_eq!(token.expose_secret(), "eyJhbGciOiJSUzI1NiJ9.payload.sig");
    }
}
