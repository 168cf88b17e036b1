//! Core types for dbkey
//!
//! This crate provides the shared error type, deployment configuration and
//! the secret-bearing value types used across the credential bootstrap.

pub mod config;
pub mod error;
pub mod identity;
pub mod secret;

// Re-exports
pub use config::{
    DatabaseConfig, DbkeyConfig, IdentityConfig, LogFileMode, LoggingConfig, VaultConfig,
};
pub use error::{ConnectionErrorKind, Error, Result, SecretFailure};
pub use identity::{IdentityToken, WorkloadIdentity};
pub use secret::{DatabaseCredentials, SecretValue};
