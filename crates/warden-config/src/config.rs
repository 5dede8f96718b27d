//! Main configuration type.

use serde::{Deserialize, Serialize};

use crate::{AuthConfig, ConfigError, LoggingConfig, SecurityConfig, ServerConfig};

/// Complete Warden configuration.
///
/// Passed explicitly into server construction; nothing in the call path reads
/// configuration from the environment. Use
/// [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use warden_config::WardenConfig;
///
/// let config = WardenConfig::default();
/// assert_eq!(config.server.addr, "0.0.0.0:50051");
/// assert!(config.security.enabled);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    /// Name reported in logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Transport security configuration.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Bearer token verification.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "warden".to_string()
}

impl WardenConfig {
    /// Validate the configuration.
    ///
    /// Checks shape only. Files referenced by the configuration (certificates,
    /// key files) are read at server construction, not here.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` or `ConfigError::ValidationError` if:
    /// - The server address is not a socket address
    /// - The request timeout is zero
    /// - Both `auth.signing_key` and `auth.signing_key_file` are set
    /// - The issuer or service name is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.addr",
                format!("invalid socket address: {}", self.server.addr),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.auth.signing_key.is_some() && self.auth.signing_key_file.is_some() {
            return Err(ConfigError::validation_error(
                "only one of auth.signing_key and auth.signing_key_file may be set",
            ));
        }

        if self.auth.issuer.trim().is_empty() {
            return Err(ConfigError::invalid_value("auth.issuer", "must not be empty"));
        }

        if self.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value("service_name", "must not be empty"));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Plaintext transport, debug level, pretty logs.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.security.enabled = false;
        config.logging.level = "debug".to_string();
        config.logging.format = crate::LogFormat::Pretty;
        config
    }
}
