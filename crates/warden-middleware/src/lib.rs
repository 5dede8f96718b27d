//! # Warden Middleware
//!
//! The fixed-order interceptor pipeline every Warden call runs through.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Call → Tags → Session → Logging ─→ Auth → Handler
//!                            │                 ↓
//! Response ←─────────────── Logging (finish) ←─┘
//! ```
//!
//! | Stage | Middleware          | Purpose                                    |
//! |-------|---------------------|--------------------------------------------|
//! | 1     | Tags                | Request id, service/method, peer, agent    |
//! | 2     | Session injection   | Attach an empty session context            |
//! | 3     | Log start           | Open the call span, emit the start event   |
//! | 4     | Authentication      | Verify the bearer token (fail closed)      |
//! | 5     | Handler             | Only after successful authentication       |
//! | 6     | Log end             | Emit the finish event with code and timing |
//!
//! ## Example
//!
//! ```
//! use warden_middleware::pipeline::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 6);
//! assert_eq!(stages[0].name(), "tags");
//! assert_eq!(stages[5].name(), "log_end");
//! ```

#![doc(html_root_url = "https://docs.rs/warden-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use middleware::{BoxFuture, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use stages::{AuthMiddleware, LoggingMiddleware, SessionMiddleware, TagsMiddleware};
pub use types::{Request, Response, ResponseExt};
