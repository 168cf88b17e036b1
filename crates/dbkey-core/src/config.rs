//! Configuration management for dbkey
//!
//! Loads configuration with priority:
//! 1. config.toml (or specified config file)
//! 2. `${VAR_NAME}` references resolved from the environment (and `.env`)
//! 3. Defaults

use crate::identity::WorkloadIdentity;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Deployment configuration for the credential bootstrap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbkeyConfig {
    /// Workload identity presented to the identity provider and the vault
    pub workload_id: String,

    /// Which identity provider strategy to use
    pub identity: IdentityConfig,

    pub vault: VaultConfig,

    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity provider strategy. Exactly one is active per deployment.
///
/// # Examples
///
/// ## Local token issuer
/// ```toml
/// [identity]
/// strategy = "local_idp"
/// token_url = "http://localhost:8000/token"
/// ```
///
/// ## Platform-mounted service account token
/// ```toml
/// [identity]
/// strategy = "mounted"
/// token_path = "/run/secrets/kubernetes.io/serviceaccount/token"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum IdentityConfig {
    LocalIdp {
        #[serde(default = "default_token_url")]
        token_url: String,

        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    Mounted {
        #[serde(default = "default_token_path")]
        token_path: PathBuf,
    },
}

/// Vault connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Tenant subdomain of the secrets manager, e.g. `cybr-secrets`
    pub namespace: String,

    /// Name of the JWT authenticator configured on the vault, e.g. `agentic`
    pub auth_method_id: String,

    #[serde(default = "default_account")]
    pub account: String,

    /// Prefix joined to the workload id to form the vault host id
    #[serde(default = "default_host_prefix")]
    pub host_prefix: String,

    /// Overrides the URL derived from `namespace`
    pub base_url: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Target database plus the vault paths of its credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,

    pub host: String,

    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name
    pub name: String,

    /// Vault path of the username secret
    pub username_secret: String,

    /// Vault path of the password secret
    pub password_secret: String,

    /// Row cap appended to SELECTs without a LIMIT
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    #[serde(default = "default_read_only")]
    pub read_only: bool,

    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Log file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Default filter when `RUST_LOG` is unset. `trace` logs identity tokens.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub mode: LogFileMode,

    /// Also write to stderr
    #[serde(default)]
    pub console: bool,
}

/// Whether an existing log file is truncated or appended to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFileMode {
    #[default]
    Overwrite,
    Append,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
            mode: LogFileMode::default(),
            console: false,
        }
    }
}

impl IdentityConfig {
    /// Short strategy label used in logs and errors
    pub fn strategy_name(&self) -> &'static str {
        match self {
            IdentityConfig::LocalIdp { .. } => "local_idp",
            IdentityConfig::Mounted { .. } => "mounted",
        }
    }
}

impl VaultConfig {
    /// Base URL of the vault API
    pub fn resolved_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => namespace_base_url(&self.namespace),
        }
    }
}

/// Secrets manager API root for a tenant namespace
pub fn namespace_base_url(namespace: &str) -> String {
    format!("https://{}.secretsmgr.cyberark.cloud/api", namespace)
}

impl DbkeyConfig {
    /// Load configuration with the following priority:
    /// 1. config.toml in current directory or a parent
    /// 2. Environment variables for `${VAR}` references
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            Self::find_config_file()?
        };

        tracing::debug!("Loading configuration from: {:?}", config_path);

        // A missing .env is normal
        let _ = dotenvy::dotenv();

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))
    }

    /// Parse, resolve and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: DbkeyConfig = toml::from_str(contents)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Find config.toml by searching current directory and parents
    fn find_config_file() -> Result<PathBuf> {
        let mut current = env::current_dir()?;

        loop {
            let config_path = current.join("config.toml");
            if config_path.exists() {
                return Ok(config_path);
            }

            if !current.pop() {
                break;
            }
        }

        Err(anyhow!(
            "config.toml not found. Create one with: cp config.toml.example config.toml"
        ))
    }

    /// Resolve ${VAR_NAME} references to environment variables
    fn resolve_env_vars(&mut self) -> Result<()> {
        Self::resolve_field("workload_id", &mut self.workload_id)?;

        match &mut self.identity {
            IdentityConfig::LocalIdp { token_url, .. } => {
                Self::resolve_field("identity.token_url", token_url)?;
            }
            IdentityConfig::Mounted { token_path } => {
                let mut raw = token_path.to_string_lossy().into_owned();
                Self::resolve_field("identity.token_path", &mut raw)?;
                *token_path = PathBuf::from(raw);
            }
        }

        Self::resolve_field("vault.namespace", &mut self.vault.namespace)?;
        Self::resolve_field("vault.auth_method_id", &mut self.vault.auth_method_id)?;
        if let Some(ref mut url) = self.vault.base_url {
            Self::resolve_field("vault.base_url", url)?;
        }

        Self::resolve_field("database.host", &mut self.database.host)?;
        Self::resolve_field("database.name", &mut self.database.name)?;
        Self::resolve_field("database.username_secret", &mut self.database.username_secret)?;
        Self::resolve_field("database.password_secret", &mut self.database.password_secret)?;

        Ok(())
    }

    fn resolve_field(name: &str, value: &mut String) -> Result<()> {
        match Self::resolve_env_var(value) {
            Some(resolved) => {
                *value = resolved;
                Ok(())
            }
            None => Err(anyhow!(
                "{} references an unset environment variable: {}",
                name,
                value
            )),
        }
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }

    /// Reject configurations that cannot produce a working bootstrap
    pub fn validate(&self) -> crate::Result<()> {
        WorkloadIdentity::new(self.workload_id.clone())?;

        let required = [
            ("vault.namespace", &self.vault.namespace),
            ("vault.auth_method_id", &self.vault.auth_method_id),
            ("vault.account", &self.vault.account),
            ("database.scheme", &self.database.scheme),
            ("database.host", &self.database.host),
            ("database.name", &self.database.name),
            ("database.username_secret", &self.database.username_secret),
            ("database.password_secret", &self.database.password_secret),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(crate::Error::config_error(format!("{} must not be empty", name)));
            }
        }

        if self.database.port == 0 {
            return Err(crate::Error::config_error("database.port must not be 0"));
        }

        if let IdentityConfig::LocalIdp { token_url, .. } = &self.identity {
            if token_url.trim().is_empty() {
                return Err(crate::Error::config_error("identity.token_url must not be empty"));
            }
        }

        Ok(())
    }

    /// Workload identity from `workload_id`
    pub fn workload(&self) -> crate::Result<WorkloadIdentity> {
        WorkloadIdentity::new(self.workload_id.clone())
    }

    /// Create test-friendly defaults (local issuer, petclinic database)
    pub fn test_defaults() -> Self {
        Self {
            workload_id: "ai-agent".to_string(),
            identity: IdentityConfig::LocalIdp {
                token_url: default_token_url(),
                timeout_secs: default_timeout_secs(),
            },
            vault: VaultConfig {
                namespace: "cybr-secrets".to_string(),
                auth_method_id: "agentic".to_string(),
                account: default_account(),
                host_prefix: default_host_prefix(),
                base_url: None,
                timeout_secs: default_timeout_secs(),
            },
            database: DatabaseConfig {
                scheme: default_scheme(),
                host: "127.0.0.1".to_string(),
                port: default_mysql_port(),
                name: "petclinic".to_string(),
                username_secret: "data/vault/JodyDemo/K8sSecrets-MySQL/username".to_string(),
                password_secret: "data/vault/JodyDemo/K8sSecrets-MySQL/password".to_string(),
                max_rows: default_max_rows(),
                read_only: default_read_only(),
                connect_timeout_secs: default_timeout_secs(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

fn default_token_url() -> String {
    "http://localhost:8000/token".to_string()
}

fn default_token_path() -> PathBuf {
    PathBuf::from("/run/secrets/kubernetes.io/serviceaccount/token")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_account() -> String {
    "conjur".to_string()
}

fn default_host_prefix() -> String {
    "host/".to_string()
}

fn default_scheme() -> String {
    "mysql".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_max_rows() -> usize {
    100
}

fn default_read_only() -> bool {
    true
}

fn default_log_file() -> PathBuf {
    PathBuf::from("./logs/dbkey.log")
}

fn default_log_level() -> String {
    "info".to_string()
}
