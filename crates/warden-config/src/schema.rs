//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::ConfigError;

/// Server configuration section.
///
/// # Example
///
/// ```
/// use warden_config::ServerConfig;
///
/// let config = ServerConfig {
///     addr: "127.0.0.1:50051".to_string(),
///     request_timeout_ms: 5_000,
///     shutdown_timeout_secs: 10,
///     trust_request_id: false,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:50051").
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Upper bound on any call's deadline, in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Graceful shutdown drain timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Adopt a valid incoming `x-request-id` instead of generating one.
    ///
    /// Only enable behind a proxy that sets or strips the header.
    #[serde(default)]
    pub trust_request_id: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            request_timeout_ms: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            trust_request_id: false,
        }
    }
}

fn default_addr() -> String {
    "0.0.0.0:50051".to_string()
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Transport security configuration section.
///
/// When enabled, the certificate and key must both be set and readable at
/// server construction. When disabled, neither file is touched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// Serve over TLS.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// PEM certificate chain path.
    #[serde(default)]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key path.
    #[serde(default)]
    pub tls_key: Option<PathBuf>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tls_cert: None,
            tls_key: None,
        }
    }
}

/// Bearer token verification section.
///
/// Exactly one of `signing_key` and `signing_key_file` must be provided
/// before a server can be built.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Inline HMAC signing secret.
    #[serde(default)]
    pub signing_key: Option<String>,

    /// Path to a file holding the HMAC signing secret.
    #[serde(default)]
    pub signing_key_file: Option<PathBuf>,

    /// Required `iss` claim.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Required `aud` claim, if any.
    #[serde(default)]
    pub audience: Option<String>,

    /// Clock-skew allowance for `exp`, in seconds.
    #[serde(default)]
    pub leeway_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_key: None,
            signing_key_file: None,
            issuer: default_issuer(),
            audience: None,
            leeway_secs: 0,
        }
    }
}

fn default_issuer() -> String {
    "warden".to_string()
}

impl AuthConfig {
    /// Resolves the signing secret from the inline value or the key file.
    ///
    /// A single trailing newline in the key file is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` if neither source is set,
    /// `ConfigError::FileNotFound` / `ConfigError::ReadError` if the key file
    /// cannot be read, and `ConfigError::InvalidValue` if the secret is empty.
    pub fn signing_secret(&self) -> Result<Vec<u8>, ConfigError> {
        let secret = match (&self.signing_key, &self.signing_key_file) {
            (Some(key), _) => key.as_bytes().to_vec(),
            (None, Some(path)) => {
                if !path.exists() {
                    return Err(ConfigError::file_not_found(path));
                }
                let mut bytes = fs::read(path).map_err(|e| ConfigError::read_error(path, e))?;
                if bytes.last() == Some(&b'\n') {
                    bytes.pop();
                    if bytes.last() == Some(&b'\r') {
                        bytes.pop();
                    }
                }
                bytes
            }
            (None, None) => return Err(ConfigError::missing_field("auth.signing_key")),
        };

        if secret.is_empty() {
            return Err(ConfigError::invalid_value(
                "auth.signing_key",
                "signing secret must not be empty",
            ));
        }
        Ok(secret)
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_key", &self.signing_key.as_ref().map(|_| "[REDACTED]"))
            .field("signing_key_file", &self.signing_key_file)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive (e.g. "info", "warden_server=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
