//! Server construction and runtime errors.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;
use warden_config::ConfigError;

/// Errors that abort server construction or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration is invalid or signing material is unavailable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport security material could not be loaded.
    #[error("failed to load TLS material ({}): {message}", path.display())]
    Tls {
        /// Certificate or key file involved.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address the server tried to bind.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Create a TLS error.
    pub fn tls(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Tls {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error was raised while loading transport security.
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls { .. })
    }
}
