//! Configuration management for the chore client.
//!
//! Settings come from defaults, optional config files and environment
//! variables, then go through [`ConfigValidator`]:
//!
//! ```rust,ignore
//! use chore_sync::config::ClientConfig;
//!
//! let config = ClientConfig::load()?;
//! ```

pub mod error;
pub mod validator;

pub use error::{ConfigResult, ConfigurationError};
pub use validator::ConfigValidator;

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Main client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Planning server connection.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Load configuration from environment and config files, then validate.
    ///
    /// Sources, in increasing priority:
    /// 1. Default values
    /// 2. Config file `config/chore-sync.{toml,yaml,json}`
    /// 3. `CHORE_SYNC__SECTION__KEY` environment variables
    /// 4. `CHORE_SYNC_BASE_URL`, `CHORE_SYNC_USER`, `CHORE_SYNC_PASSWORD`,
    ///    `CHORE_SYNC_NAMESPACE`
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::load_unchecked()?;

        ConfigValidator::validate(&config)
            .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n\n{e}"))?;

        Ok(config)
    }

    /// Load configuration without validation.
    pub fn load_unchecked() -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = Self::defaults()?
            .add_source(config::File::with_name("config/chore-sync").required(false))
            .add_source(
                config::Environment::with_prefix("CHORE_SYNC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut client_config: ClientConfig = config.try_deserialize()?;
        client_config.apply_env_overrides();
        Ok(client_config)
    }

    /// Load a single explicit config file on top of the defaults and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config = Self::defaults()?
            .add_source(config::File::from(path.as_ref()).required(true))
            .build()?;

        let client_config: ClientConfig = config.try_deserialize()?;
        ConfigValidator::validate(&client_config)
            .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n\n{e}"))?;
        Ok(client_config)
    }

    fn defaults() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("server.base_url", default_base_url())?
            .set_default("server.timeout_secs", default_timeout())?
            .set_default("server.verify_ssl", true)?
            .set_default("server.session_context", default_session_context())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CHORE_SYNC_BASE_URL") {
            self.server.base_url = url;
        }
        if let Ok(user) = std::env::var("CHORE_SYNC_USER") {
            self.server.user = Some(user);
        }
        if let Ok(password) = std::env::var("CHORE_SYNC_PASSWORD") {
            self.server.password = Some(password);
        }
        if let Ok(namespace) = std::env::var("CHORE_SYNC_NAMESPACE") {
            self.server.namespace = Some(namespace);
        }
    }
}

/// Planning server connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// REST root, e.g. `https://planning:8010/api/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// User name.
    pub user: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// CAM namespace; switches authentication from Basic to CAMNamespace.
    pub namespace: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Reject invalid TLS certificates.
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    /// Value of the session context header shown in the server's thread monitor.
    #[serde(default = "default_session_context")]
    pub session_context: String,
}

fn default_base_url() -> String {
    "http://localhost:8010/api/v1".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_session_context() -> String {
    "chore-sync".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user: None,
            password: None,
            namespace: None,
            timeout_secs: default_timeout(),
            verify_ssl: true,
            session_context: default_session_context(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("namespace", &self.namespace)
            .field("timeout_secs", &self.timeout_secs)
            .field("verify_ssl", &self.verify_ssl)
            .field("session_context", &self.session_context)
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to use JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
