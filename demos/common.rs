//! Shared setup for the dbkey demos
//!
//! Included via `#[path = "common.rs"] mod common;`; not a standalone demo.

#![allow(dead_code)]

use anyhow::{Context, Result};
use dbkey_core::DbkeyConfig;
use dbkey_telemetry::{LoggingGuard, init_logging};

/// Load config.toml and start file logging.
///
/// Keep the returned guard alive for the whole run or buffered log lines are lost.
pub fn setup() -> Result<(DbkeyConfig, LoggingGuard)> {
    let config = DbkeyConfig::load().context(
        "Failed to load configuration. Copy config.toml.example to config.toml and edit it",
    )?;
    let guard = init_logging(&config.logging)?;

    println!("✓ Configuration loaded");
    println!("  Workload: {}", config.workload_id);
    println!("  Identity strategy: {}", config.identity.strategy_name());
    println!("  Vault namespace: {}", config.vault.namespace);
    println!(
        "  Database: {}:{}/{}",
        config.database.host, config.database.port, config.database.name
    );
    println!("  Log file: {}", config.logging.file.display());

    Ok((config, guard))
}
