//! Query the petclinic database through the read-only query guard
//!
//! ```bash
//! cargo run --example mysql_pets
//! ```

#[path = "common.rs"]
mod common;

use anyhow::Result;
use dbkey_bootstrap::Bootstrap;

#[tokio::main]
async fn main() -> Result<()> {
    let (config, _guard) = common::setup()?;

    let mut conn = Bootstrap::from_config(&config)?.connect().await?;

    let rows = conn.query("select name, birth_date from pets").await;
    // Writes are refused in read-only mode before reaching the server
    let refused = conn.query("DELETE FROM pets").await;
    conn.close().await?;

    let rows = rows?;
    println!("\n{} pets:", rows.len());
    for row in &rows {
        println!(
            "  {:<12} born {}",
            row["name"].as_str().unwrap_or("?"),
            row["birth_date"].as_str().unwrap_or("unknown")
        );
    }

    if let Err(e) = refused {
        println!("\n✓ Guard refused write: {}", e);
    }

    Ok(())
}
