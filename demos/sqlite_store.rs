//! Local agent state in an embedded SQLite file
//!
//! ```bash
//! cargo run --example sqlite_store -- ./agent_state.db
//! ```

use anyhow::Result;
use dbkey_database::{SqliteStore, record};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "agent_state.db".to_string());
    let store = SqliteStore::open(&path).await?;

    store
        .execute(
            "CREATE TABLE IF NOT EXISTS owners (\
             id INTEGER PRIMARY KEY, first_name TEXT, last_name TEXT, city TEXT)",
        )
        .await?;

    for (id, first, last, city) in [
        (1, "George", "Franklin", "Madison"),
        (2, "Betty", "Davis", "Sun Prairie"),
        (3, "Eduardo", "Rodriquez", "McFarland"),
    ] {
        store
            .upsert(
                "owners",
                &record([
                    ("id", json!(id)),
                    ("first_name", json!(first)),
                    ("last_name", json!(last)),
                    ("city", json!(city)),
                ]),
            )
            .await?;
    }

    // Rewrite one row in place
    store
        .upsert(
            "owners",
            &record([
                ("id", json!(2)),
                ("first_name", json!("Betty")),
                ("last_name", json!("Davis")),
                ("city", json!("Monona")),
            ]),
        )
        .await?;
    store.delete("owners", &json!(3)).await?;

    println!("Owners in {}:", path);
    for owner in store.get_all("owners").await? {
        println!("  {}", serde_json::Value::Object(owner));
    }

    println!("\nPrompt schema:\n{}", store.table_definitions_for_prompt().await?);
    store.close().await;
    Ok(())
}
