//! Vault secret retrieval for dbkey
//!
//! [`SecretRetriever`] exchanges a freshly fetched workload token for named
//! secrets. The vault itself sits behind the [`VaultApi`] trait, with
//! [`ConjurClient`] as the HTTP implementation.

pub mod api;
pub mod conjur;
pub mod retriever;

// Re-exports
pub use api::{AuthRequest, VaultApi, VaultSession};
pub use conjur::ConjurClient;
pub use retriever::{SecretReference, SecretRetriever, VaultSettings};
