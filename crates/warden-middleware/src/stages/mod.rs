//! Core pipeline stages.
//!
//! ## Pre-Handler Stages
//!
//! 1. [`tags`] - Request id and call tags
//! 2. [`session`] - Attach an empty session context
//! 3. [`logging`] - Call span, start and finish events
//! 4. [`auth`] - Bearer authentication

pub mod auth;
pub mod logging;
pub mod session;
pub mod tags;

pub use auth::AuthMiddleware;
pub use logging::LoggingMiddleware;
pub use session::SessionMiddleware;
pub use tags::TagsMiddleware;
