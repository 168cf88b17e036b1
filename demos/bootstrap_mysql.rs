//! Bootstrap a MySQL connection from workload identity
//!
//! Fetches a workload token, exchanges it for the database credentials held
//! in the vault, opens the connection, and prints the table definitions an
//! agent prompt would embed.
//!
//! Setup:
//! ```bash
//! cp config.toml.example config.toml
//! cargo run --example bootstrap_mysql
//! ```

#[path = "common.rs"]
mod common;

use anyhow::Result;
use dbkey_bootstrap::Bootstrap;

#[tokio::main]
async fn main() -> Result<()> {
    let (config, _guard) = common::setup()?;

    let bootstrap = Bootstrap::from_config(&config)?;

    let descriptor = bootstrap.descriptor().await?;
    println!("\n✓ Credentials retrieved from vault");
    println!("  Connection: {}", descriptor.redacted());

    let mut conn = bootstrap.connect_with(&descriptor).await?;
    conn.ping().await?;
    println!("✓ Connected\n");

    let definitions = conn.table_definitions_for_prompt().await;
    conn.close().await?;

    println!("Table definitions:\n{}", definitions?);
    Ok(())
}
