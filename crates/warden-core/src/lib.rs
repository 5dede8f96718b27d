//! # Warden Core
//!
//! Core types for the Warden RPC authentication pipeline.
//!
//! - [`CallScope`] - Per-call context threaded through every pipeline stage
//! - [`RequestId`] - UUID v7 call identifier
//! - [`SessionContext`] - Per-call identity and authentication status
//! - [`SigningKey`] - Process-wide token verification key
//! - [`AuthError`] / [`Status`] - Authentication failures and caller-facing status

#![doc(html_root_url = "https://docs.rs/warden-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod key;
mod session;

pub use context::{CallOutcome, CallScope, CallState, CallTags, RequestId};
pub use error::{AuthError, AuthErrorKind, Code, Status, StatusResult};
pub use key::SigningKey;
pub use session::{Claims, SessionContext};

pub use tokio_util::sync::CancellationToken;
