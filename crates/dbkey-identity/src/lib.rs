//! Workload identity token providers
//!
//! Two interchangeable strategies produce the bearer token the vault expects:
//! - [`LocalIdpTokenProvider`]: POSTs the workload id to a local token issuer
//! - [`MountedTokenProvider`]: reads the platform-mounted service account token
//!
//! Pick one with [`provider_from_config`].

pub mod factory;
pub mod local_idp;
pub mod mounted;
pub mod provider;

// Re-exports
pub use factory::provider_from_config;
pub use local_idp::{LocalIdpTokenProvider, parse_token_response};
pub use mounted::{DEFAULT_TOKEN_PATH, MountedTokenProvider};
pub use provider::{StaticTokenProvider, TokenProvider};
