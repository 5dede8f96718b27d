//! Observability setup for Warden.
//!
//! - **Logging**: structured JSON or pretty output through `tracing-subscriber`
//! - **Metrics**: call counters and latency histograms are recorded through
//!   the `metrics` facade by the pipeline; installing a recorder is left to
//!   the embedding process
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `warden_calls_total` | Counter | `service`, `method`, `code` | Finished calls |
//! | `warden_call_duration_seconds` | Histogram | `service`, `method`, `code` | Call latency |
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
