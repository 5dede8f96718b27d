//! # Warden Server
//!
//! Serves unary RPC calls behind a fail-closed bearer-token pipeline.
//!
//! - [`ChainBuilder`] assembles the fixed-order pipeline and loads TLS
//! - [`Server`] drives each call through it under a deadline
//! - [`ServiceRegistry`] maps `/package.Service/Method` paths to handlers
//! - [`ShutdownSignal`] cancels in-flight calls and stops serving
//!
//! ## Example
//!
//! ```rust,no_run
//! use warden_config::WardenConfig;
//! use warden_core::{SessionContext, Status};
//! use warden_server::{Server, ServiceRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = WardenConfig::development();
//!     config.auth.signing_key = Some("dev-secret".to_string());
//!
//!     let mut registry = ServiceRegistry::new();
//!     registry.register("/demo.Greeter/Hello", |ctx, _body| async move {
//!         SessionContext::retrieve(&ctx)
//!             .map(|s| bytes::Bytes::from(format!("hello {}", s.subject().unwrap_or_default())))
//!             .map_err(Status::from)
//!     });
//!
//!     Server::new(&config, registry).await?.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/warden-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod deadline;
mod error;
pub mod handler;
mod server;
pub mod shutdown;

pub use chain::{Chain, ChainBuilder};
pub use error::ServerError;
pub use handler::{BoxedHandler, ServiceRegistry};
pub use server::Server;
pub use shutdown::{CallGuard, CallTracker, ShutdownSignal};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
