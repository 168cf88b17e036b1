//! Credential bootstrap for agent workloads
//!
//! Chains the configured identity token strategy, the vault and the database
//! connector: workload identity, then token, then secrets, then a connection
//! string, then an open connection.

pub mod bootstrap;

pub use bootstrap::{Bootstrap, BootstrapBuilder};
