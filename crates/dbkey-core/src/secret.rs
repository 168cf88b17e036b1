//! Secret-bearing value types.
//!
//! Everything fetched from the vault or the identity provider is wrapped in a
//! type whose `Debug`, `Display` and `Serialize` output is redacted, so a stray
//! `tracing::info!(?value)` cannot leak it. The raw value is only reachable
//! through an explicit `expose_secret()` call.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

const REDACTED: &str = "[REDACTED]";

/// A plaintext secret held only in process memory.
///
/// - `Debug` prints `SecretValue([REDACTED])`, `Display` prints `[REDACTED]`
/// - serialization always writes `"[REDACTED]"`; deserialization accepts real values
/// - the buffer is zeroed when dropped
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying value.
    ///
    /// Only call this where the plaintext is handed to a driver or a wire
    /// protocol. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(SecretValue(value))
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue({})", REDACTED)
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl PartialEq for SecretValue {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretValue {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Username and password resolved from the vault for one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseCredentials {
    pub username: SecretValue,
    pub password: SecretValue,
}

impl DatabaseCredentials {
    pub fn new(username: impl Into<SecretValue>, password: impl Into<SecretValue>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}
