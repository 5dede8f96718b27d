//! Typed configuration for Warden.
//!
//! This crate provides a strongly-typed configuration for Warden servers
//! with support for:
//! - TOML and JSON configuration files
//! - `.env` files and environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! The configuration is built around the [`WardenConfig`] struct:
//!
//! - [`ServerConfig`] - listen address, call timeout, shutdown drain
//! - [`SecurityConfig`] - TLS toggle and certificate/key paths
//! - [`AuthConfig`] - signing secret, issuer, audience, leeway
//! - [`LoggingConfig`] - log level and output format
//!
//! # Example
//!
//! ```no_run
//! use warden_config::ConfigLoader;
//!
//! # fn main() -> Result<(), warden_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("warden.toml")?
//!     .with_env_prefix("WARDEN")
//!     .load()?;
//!
//! println!("Server will listen on: {}", config.server.addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! service_name = "auth"
//!
//! [server]
//! addr = "0.0.0.0:50051"
//! request_timeout_ms = 30000
//! shutdown_timeout_secs = 30
//! trust_request_id = false
//!
//! [security]
//! enabled = true
//! tls_cert = "/etc/warden/server.crt"
//! tls_key = "/etc/warden/server.key"
//!
//! [auth]
//! signing_key_file = "/etc/warden/signing.key"
//! issuer = "warden"
//! leeway_secs = 0
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden via environment variables using the format
//! `PREFIX__SECTION__KEY`. For example:
//!
//! - `WARDEN__SERVER__ADDR=0.0.0.0:6000`
//! - `WARDEN__SECURITY__ENABLED=false`
//! - `WARDEN__AUTH__SIGNING_KEY=...`
//! - `WARDEN__SERVICE_NAME=auth`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::*;
