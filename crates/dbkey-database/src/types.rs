//! Shared types for database access

use serde_json::{Map, Value};

/// One result row, keyed by column name
pub type Record = Map<String, Value>;

/// Build a [`Record`] from `(column, value)` pairs
pub fn record<I, K, V>(pairs: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
