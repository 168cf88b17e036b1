use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Token fetch failed ({strategy}): {message}")]
    TokenFetch {
        strategy: &'static str,
        message: String,
    },

    #[error("Secret retrieval failed for '{path}': {reason}")]
    SecretRetrieval {
        path: String,
        #[source]
        reason: SecretFailure,
    },

    #[error("Connection error ({kind}): {message}")]
    Connection {
        kind: ConnectionErrorKind,
        message: String,
    },

    #[error("Query rejected: {0}")]
    QueryRejected(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why the vault refused or failed to hand over a secret.
///
/// Variants carry HTTP status codes and transport descriptions only, never
/// the presented token or the secret value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretFailure {
    #[error("network failure: {0}")]
    Network(String),

    #[error("vault rejected authentication (HTTP {status})")]
    AuthenticationRejected { status: u16 },

    #[error("access to secret denied (HTTP {status})")]
    AccessDenied { status: u16 },

    #[error("secret not found")]
    NotFound,

    #[error("malformed vault response: {0}")]
    MalformedResponse(String),

    #[error("unexpected vault response (HTTP {status})")]
    UnexpectedStatus { status: u16 },
}

/// Driver-reported failure category for opening or using a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionErrorKind {
    /// The server rejected the credentials.
    AccessDenied,
    /// The server is reachable but the database does not exist.
    UnknownDatabase,
    /// The server could not be reached or dropped the connection.
    Unavailable,
    /// The handle was already closed.
    Closed,
    Other,
}

impl ConnectionErrorKind {
    /// True when retrying with the same credentials cannot succeed.
    pub fn is_credential_problem(&self) -> bool {
        matches!(self, ConnectionErrorKind::AccessDenied)
    }

    pub fn is_availability_problem(&self) -> bool {
        matches!(self, ConnectionErrorKind::Unavailable)
    }
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionErrorKind::AccessDenied => "access denied",
            ConnectionErrorKind::UnknownDatabase => "unknown database",
            ConnectionErrorKind::Unavailable => "unavailable",
            ConnectionErrorKind::Closed => "closed",
            ConnectionErrorKind::Other => "other",
        };
        f.write_str(label)
    }
}

impl Error {
    /// Helper for creating token fetch errors
    ///
    /// # Example
    /// ```
    /// use dbkey_core::Error;
    /// let err = Error::token_fetch("local_idp", "token endpoint returned HTTP 500");
    /// assert!(err.is_token_fetch());
    /// ```
    pub fn token_fetch(strategy: &'static str, message: impl Into<String>) -> Self {
        Error::TokenFetch {
            strategy,
            message: message.into(),
        }
    }

    /// Helper for creating secret retrieval errors
    pub fn secret_retrieval(path: impl Into<String>, reason: SecretFailure) -> Self {
        Error::SecretRetrieval {
            path: path.into(),
            reason,
        }
    }

    /// Helper for creating connection errors
    ///
    /// # Example
    /// ```
    /// use dbkey_core::{ConnectionErrorKind, Error};
    /// let err = Error::connection(ConnectionErrorKind::AccessDenied, "MySQL error 1045");
    /// assert_eq!(err.connection_kind(), Some(ConnectionErrorKind::AccessDenied));
    /// ```
    pub fn connection(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Error::Connection {
            kind,
            message: message.into(),
        }
    }

    /// Helper for creating configuration errors
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating general errors with a message
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Other(anyhow::anyhow!("{}", msg.into()))
    }

    pub fn is_token_fetch(&self) -> bool {
        matches!(self, Error::TokenFetch { .. })
    }

    pub fn is_secret_retrieval(&self) -> bool {
        matches!(self, Error::SecretRetrieval { .. })
    }

    /// Connection failure category, if this is a connection error
    pub fn connection_kind(&self) -> Option<ConnectionErrorKind> {
        match self {
            Error::Connection { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
