//! MySQL connector backed by sqlx

use crate::connection::{ConnectionDescriptor, ConnectionHandle, Connector, DatabaseSession};
use crate::policy::QueryPolicy;
use crate::types::Record;
use async_trait::async_trait;
use dbkey_core::{ConnectionErrorKind, DatabaseConfig, Error, Result};
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::error::DatabaseError;
use sqlx::{Column, ConnectOptions, Connection, Row, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;

/// Opens single MySQL connections from a [`ConnectionDescriptor`]
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    policy: QueryPolicy,
    connect_timeout: Duration,
}

impl MySqlConnector {
    pub fn new(policy: QueryPolicy, connect_timeout: Duration) -> Self {
        Self {
            policy,
            connect_timeout,
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(
            QueryPolicy::from(config),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }
}

impl Default for MySqlConnector {
    fn default() -> Self {
        Self::new(QueryPolicy::default(), Duration::from_secs(30))
    }
}

/// Parse the descriptor's connection string into driver options.
///
/// Percent-encoded credentials are decoded by the driver, so the options
/// carry the exact username and password held by the vault.
pub fn mysql_options(descriptor: &ConnectionDescriptor) -> Result<MySqlConnectOptions> {
    MySqlConnectOptions::from_str(descriptor.connection_string().expose_secret()).map_err(|_| {
        Error::config_error(format!(
            "invalid MySQL connection string {}",
            descriptor.redacted()
        ))
    })
}

#[async_trait]
impl Connector for MySqlConnector {
    fn scheme(&self) -> &'static str {
        "mysql"
    }

    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<ConnectionHandle> {
        if descriptor.scheme != self.scheme() {
            return Err(Error::config_error(format!(
                "MySQL connector cannot open '{}' connections",
                descriptor.scheme
            )));
        }

        let options = mysql_options(descriptor)?;
        tracing::debug!(url = %descriptor.redacted(), "Opening MySQL connection");

        let conn = match tokio::time::timeout(self.connect_timeout, options.connect()).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(err)) => {
                let (kind, message) = classify_sqlx_error(&err);
                tracing::warn!(
                    host = %descriptor.host,
                    port = descriptor.port,
                    database = %descriptor.database,
                    kind = %kind,
                    "MySQL connection failed"
                );
                return Err(Error::connection(kind, message));
            }
            Err(_) => {
                return Err(Error::connection(
                    ConnectionErrorKind::Unavailable,
                    format!(
                        "timed out after {}s connecting to {}:{}",
                        self.connect_timeout.as_secs(),
                        descriptor.host,
                        descriptor.port
                    ),
                ));
            }
        };

        tracing::info!(
            host = %descriptor.host,
            port = descriptor.port,
            database = %descriptor.database,
            "MySQL connection established"
        );

        Ok(ConnectionHandle::new(
            Box::new(MySqlSession { conn }),
            self.policy.clone(),
        ))
    }
}

/// Map a MySQL server error number to a connection failure category
pub fn classify_mysql_error_number(number: u16) -> ConnectionErrorKind {
    match number {
        // ER_DBACCESS_DENIED_ERROR, ER_ACCESS_DENIED_ERROR, ER_ACCESS_DENIED_NO_PASSWORD_ERROR
        1044 | 1045 | 1698 => ConnectionErrorKind::AccessDenied,
        // ER_BAD_DB_ERROR
        1049 => ConnectionErrorKind::UnknownDatabase,
        // too many connections, shutdown in progress, client-side connection errors
        1040 | 1053 | 2002 | 2003 | 2006 | 2013 => ConnectionErrorKind::Unavailable,
        _ => ConnectionErrorKind::Other,
    }
}

/// Categorize a driver error.
///
/// The returned message never includes the server's text for authentication
/// failures, which echoes the username.
pub fn classify_sqlx_error(err: &sqlx::Error) -> (ConnectionErrorKind, String) {
    match err {
        sqlx::Error::Database(db) => match db.try_downcast_ref::<MySqlDatabaseError>() {
            Some(mysql) => {
                let kind = classify_mysql_error_number(mysql.number());
                let message = match kind {
                    ConnectionErrorKind::AccessDenied => {
                        format!("MySQL error {}: access denied", mysql.number())
                    }
                    _ => format!("MySQL error {}: {}", mysql.number(), mysql.message()),
                };
                (kind, message)
            }
            None => (ConnectionErrorKind::Other, db.message().to_string()),
        },
        sqlx::Error::Io(io) => (ConnectionErrorKind::Unavailable, format!("I/O error: {}", io)),
        sqlx::Error::Tls(tls) => (ConnectionErrorKind::Unavailable, format!("TLS error: {}", tls)),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
            (ConnectionErrorKind::Unavailable, err.to_string())
        }
        sqlx::Error::Configuration(_) => (
            ConnectionErrorKind::Other,
            "invalid connection configuration".to_string(),
        ),
        other => (ConnectionErrorKind::Other, other.to_string()),
    }
}

fn query_error(err: sqlx::Error) -> Error {
    match classify_sqlx_error(&err) {
        (kind @ ConnectionErrorKind::Unavailable, message) => Error::connection(kind, message),
        (_, message) => Error::Database(message),
    }
}

struct MySqlSession {
    conn: MySqlConnection,
}

#[async_trait]
impl DatabaseSession for MySqlSession {
    async fn ping(&mut self) -> Result<()> {
        self.conn.ping().await.map_err(query_error)
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Record>> {
        let rows = sqlx::query(sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(query_error)?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn table_names(&mut self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT CAST(table_name AS CHAR) AS name \
             FROM information_schema.tables \
             WHERE table_schema = DATABASE() \
             ORDER BY table_name",
        )
        .fetch_all(&mut self.conn)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(query_error))
            .collect()
    }

    async fn table_definition(&mut self, table: &str) -> Result<String> {
        let row = sqlx::query(&format!("SHOW CREATE TABLE {}", quote_identifier(table)))
            .fetch_one(&mut self.conn)
            .await
            .map_err(query_error)?;

        row.try_get::<String, _>(1)
            .or_else(|_| {
                row.try_get::<Vec<u8>, _>(1)
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            })
            .map_err(query_error)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await.map_err(query_error)?;
        tracing::debug!("MySQL connection closed");
        Ok(())
    }
}

fn row_to_record(row: &MySqlRow) -> Record {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| (column.name().to_string(), decode_column(row, i)))
        .collect()
}

fn decode_column(row: &MySqlRow, index: usize) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => {}
        _ => return Value::Null,
    }

    let type_name = row.columns()[index].type_info().name().to_ascii_uppercase();
    let decoded = match type_name.as_str() {
        "BOOLEAN" => row.try_get::<bool, _>(index).ok().map(Value::from),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<i64, _>(index).ok().map(Value::from)
        }
        name if name.ends_with("UNSIGNED") => row.try_get::<u64, _>(index).ok().map(Value::from),
        "YEAR" => row.try_get::<u16, _>(index).ok().map(Value::from),
        "FLOAT" => row.try_get::<f32, _>(index).ok().map(|v| Value::from(v as f64)),
        "DOUBLE" => row.try_get::<f64, _>(index).ok().map(Value::from),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .ok()
            .map(|v| Value::from(v.to_string())),
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .ok()
            .map(|v| Value::from(v.to_string())),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(index)
            .ok()
            .map(|v| Value::from(v.to_string())),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .ok()
            .map(|bytes| Value::from(String::from_utf8_lossy(&bytes).into_owned())),
        _ => row.try_get::<String, _>(index).ok().map(Value::from),
    };

    // DECIMAL, JSON and friends arrive as text
    decoded
        .or_else(|| {
            row.try_get_unchecked::<String, _>(index)
                .ok()
                .map(Value::from)
        })
        .unwrap_or(Value::Null)
}

/// Backtick-quote a MySQL identifier, doubling any embedded backtick
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
