//! Database access for dbkey
//!
//! Turns vault-issued credentials into a connection: [`build_connection_string`]
//! formats the driver URL, a [`Connector`] opens it, and the resulting
//! [`ConnectionHandle`] runs agent queries through a [`QueryPolicy`].
//! [`SqliteStore`] is a small embedded store for local agent state.

pub mod connection;
pub mod mysql;
pub mod policy;
pub mod sqlite;
pub mod types;

// Re-exports
pub use connection::{
    ConnectionDescriptor, ConnectionHandle, Connector, DatabaseSession, build_connection_string,
};
pub use mysql::{MySqlConnector, classify_mysql_error_number, classify_sqlx_error, mysql_options};
pub use policy::{QueryPolicy, SqlOperation, validate_identifier};
pub use sqlite::SqliteStore;
pub use types::{Record, record};
