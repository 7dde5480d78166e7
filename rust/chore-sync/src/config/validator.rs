//! Configuration validation for the chore client.
//!
//! Every problem is collected before returning so the user can fix them in
//! one pass.

use url::Url;

use super::error::{ConfigResult, ConfigurationError};
use super::{ClientConfig, LoggingConfig, ServerConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Checks a loaded [`ClientConfig`] before a client is built from it.
#[derive(Debug)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire client configuration.
    pub fn validate(config: &ClientConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        for result in [
            Self::validate_server(&config.server),
            Self::validate_logging(&config.logging),
        ] {
            match result {
                Ok(()) => {}
                Err(ConfigurationError::Multiple(errs)) => errors.extend(errs),
                Err(e) => errors.push(e),
            }
        }

        ConfigurationError::from_list(errors)
    }

    /// Validate connection settings.
    pub fn validate_server(server: &ServerConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        match Url::parse(&server.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ConfigurationError::invalid(
                format!("server.base_url uses unsupported scheme '{}'", url.scheme()),
                "Use an http:// or https:// URL, e.g. https://planning:8010/api/v1",
            )),
            Err(e) => errors.push(ConfigurationError::invalid(
                format!("server.base_url '{}' is not a valid URL: {e}", server.base_url),
                "Set CHORE_SYNC_BASE_URL to the REST root, e.g. https://planning:8010/api/v1",
            )),
        }

        if server.timeout_secs == 0 {
            errors.push(ConfigurationError::invalid(
                "server.timeout_secs must be greater than 0",
                "Set server.timeout_secs to the request timeout in seconds (default 60)",
            ));
        }

        if server.user.is_none() {
            if server.namespace.is_some() {
                errors.push(ConfigurationError::missing_required(
                    "server.user",
                    "Authenticating against a CAM namespace",
                    "CHORE_SYNC_USER",
                ));
            } else if server.password.is_some() {
                errors.push(ConfigurationError::missing_required(
                    "server.user",
                    "Basic authentication with the configured password",
                    "CHORE_SYNC_USER",
                ));
            }
        }

        ConfigurationError::from_list(errors)
    }

    /// Validate logging settings.
    pub fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
        let level = logging.level.to_ascii_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            Ok(())
        } else {
            Err(ConfigurationError::invalid(
                format!("logging.level '{}' is not a log level", logging.level),
                format!("Use one of: {}", LOG_LEVELS.join(", ")),
            ))
        }
    }
}
