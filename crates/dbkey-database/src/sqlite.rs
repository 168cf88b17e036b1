//! Embedded SQLite store
//!
//! A thin record-oriented wrapper used by agents for local scratch state.
//! Table and column names are validated and quoted; values are always bound.

use crate::policy::validate_identifier;
use crate::types::Record;
use dbkey_core::{Error, Result};
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};
use std::path::Path;
use std::str::FromStr;

/// Single-file (or in-memory) SQLite database
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database file at `path`, creating it if missing
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let store = Self::connect(options).await?;
        tracing::info!(path = %path.display(), "SQLite store opened");
        Ok(store)
    }

    /// Private in-memory database, discarded on close
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(sqlite_error)?;
        Self::connect(options).await
    }

    /// SQLite stores are opened from a file path only
    pub async fn connect_with_url(_url: &str) -> Result<Self> {
        Err(Error::config_error(
            "SQLite does not support connection via URL; use SqliteStore::open",
        ))
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self> {
        // One connection keeps in-memory databases alive and writes serialized
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(sqlite_error)?;
        Ok(Self { pool })
    }

    /// Run a statement that returns no rows, yielding the affected row count
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(sqlite_error)?;
        Ok(result.rows_affected())
    }

    /// Insert `record`, replacing any row with the same primary key
    pub async fn upsert(&self, table: &str, record: &Record) -> Result<u64> {
        let table = validate_identifier(table)?;
        if record.is_empty() {
            return Err(Error::QueryRejected(format!(
                "cannot upsert an empty record into {}",
                table
            )));
        }

        let columns = record
            .keys()
            .map(|column| validate_identifier(column).map(quote))
            .collect::<Result<Vec<_>>>()?;
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            quote(table),
            columns.join(", "),
            placeholders
        );

        let query = record
            .values()
            .fold(sqlx::query(&sql), |query, value| bind_value(query, value));
        let result = query.execute(&self.pool).await.map_err(sqlite_error)?;

        tracing::debug!(table = %table, "Record upserted");
        Ok(result.rows_affected())
    }

    /// Delete the row whose `id` column equals `id`
    pub async fn delete(&self, table: &str, id: &Value) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE id = ?", quote(validate_identifier(table)?));
        let result = bind_value(sqlx::query(&sql), id)
            .execute(&self.pool)
            .await
            .map_err(sqlite_error)?;
        Ok(result.rows_affected())
    }

    /// Fetch the row whose `id` column equals `id`
    pub async fn get(&self, table: &str, id: &Value) -> Result<Option<Record>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", quote(validate_identifier(table)?));
        let row = bind_value(sqlx::query(&sql), id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlite_error)?;
        Ok(row.as_ref().map(row_to_record))
    }

    pub async fn get_all(&self, table: &str) -> Result<Vec<Record>> {
        let sql = format!("SELECT * FROM {}", quote(validate_identifier(table)?));
        self.run_query(&sql).await
    }

    /// Run arbitrary SQL and return its rows
    pub async fn run_query(&self, sql: &str) -> Result<Vec<Record>> {
        tracing::debug!(sql = %sql, "Executing SQLite query");
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlite_error)?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    pub async fn list_table_names(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(sqlite_error)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(sqlite_error))
            .collect()
    }

    /// The `CREATE TABLE` statement stored for `table`
    pub async fn get_table_definition(&self, table: &str) -> Result<String> {
        self.stored_definition(validate_identifier(table)?).await
    }

    async fn stored_definition(&self, table: &str) -> Result<String> {
        let sql: Option<String> =
            sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(&self.pool)
                .await
                .map_err(sqlite_error)?;

        sql.ok_or_else(|| Error::Database(format!("no such table: {}", table)))
    }

    pub async fn table_definitions_for_prompt(&self) -> Result<String> {
        let mut definitions = Vec::new();
        for name in self.list_table_names().await? {
            definitions.push(self.stored_definition(&name).await?);
        }
        Ok(definitions.join("\n"))
    }

    /// Close the underlying connection. Safe to call more than once.
    pub async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            tracing::debug!("SQLite store closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

fn sqlite_error(err: sqlx::Error) -> Error {
    Error::Database(err.to_string())
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        // Arrays and objects are stored as JSON text
        other => query.bind(other.to_string()),
    }
}

fn row_to_record(row: &SqliteRow) -> Record {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| (column.name().to_string(), decode_column(row, i)))
        .collect()
}

fn decode_column(row: &SqliteRow, index: usize) -> Value {
    // SQLite is dynamically typed; decode by the stored value's storage class
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => raw.type_info().name().to_string(),
        _ => return Value::Null,
    };

    let decoded = match storage_class.as_str() {
        "INTEGER" => row.try_get_unchecked::<i64, _>(index).ok().map(Value::from),
        "REAL" => row.try_get_unchecked::<f64, _>(index).ok().map(Value::from),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .ok()
            .map(|bytes| Value::from(String::from_utf8_lossy(&bytes).into_owned())),
        _ => row.try_get_unchecked::<String, _>(index).ok().map(Value::from),
    };
    decoded.unwrap_or(Value::Null)
}
