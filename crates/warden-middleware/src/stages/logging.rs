//! Call logging middleware.
//!
//! Wraps the rest of the pipeline in an `rpc` span and emits one start event
//! and one finish event per call. Because it runs before authentication, calls
//! rejected by later stages are logged with their final code as well.
//!
//! # Log Format
//!
//! Span fields:
//! - `service.name` - The serving process
//! - `request_id` - Unique call identifier
//! - `grpc.service` / `grpc.method` - The RPC being called
//! - `peer.address` - Remote address, when known
//!
//! The finish event adds `grpc.code` and `time_ms`. Its level depends on the
//! code; see [`level_for`].
//!
//! # Metrics Emitted
//!
//! - `warden_calls_total` - Counter of calls by service, method and code
//! - `warden_call_duration_seconds` - Histogram of call latency
//!
//! Metric labels name a service and method only when the method is registered
//! with [`LoggingMiddleware::with_known_methods`]. Every other path is counted
//! under `unknown`, so callers cannot mint new series.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Instrument, Level};
use warden_core::{CallScope, CallState, CallTags, Code};

/// Counter of finished calls.
pub const CALLS_TOTAL: &str = "warden_calls_total";

/// Histogram of call latency in seconds.
pub const CALL_DURATION_SECONDS: &str = "warden_call_duration_seconds";

/// Label value for calls to methods that are not registered.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Middleware that logs the start and finish of every call.
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    service_name: String,
    known_methods: Arc<HashSet<String>>,
}

impl LoggingMiddleware {
    /// Creates a logging middleware for the given service.
    ///
    /// No method is known until [`with_known_methods`](Self::with_known_methods)
    /// is called.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            known_methods: Arc::new(HashSet::new()),
        }
    }

    /// Sets the `/{service}/{method}` paths that get their own metric labels.
    #[must_use]
    pub fn with_known_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_methods = Arc::new(methods.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the `(service, method)` label values for a call.
    #[must_use]
    pub fn metric_labels(&self, tags: &CallTags) -> (String, String) {
        match (&tags.service, &tags.method, tags.full_method()) {
            (Some(service), Some(method), Some(path)) if self.known_methods.contains(&path) => {
                (service.clone(), method.clone())
            }
            _ => (UNKNOWN_LABEL.to_string(), UNKNOWN_LABEL.to_string()),
        }
    }

    /// Returns the service name recorded on every call span.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// Returns the level the finish event is logged at for `code`.
#[must_use]
pub const fn level_for(code: Code) -> Level {
    match code {
        Code::Ok
        | Code::Cancelled
        | Code::InvalidArgument
        | Code::NotFound
        | Code::Unauthenticated => Level::INFO,
        Code::DeadlineExceeded | Code::PermissionDenied | Code::Unavailable => Level::WARN,
        Code::Unknown | Code::Unimplemented | Code::Internal => Level::ERROR,
    }
}

fn emit_finish(code: Code, message: &str, time_ms: f64) {
    let level = level_for(code);
    if level == Level::ERROR {
        tracing::error!(grpc.code = %code, grpc.message = message, time_ms, "finished call");
    } else if level == Level::WARN {
        tracing::warn!(grpc.code = %code, grpc.message = message, time_ms, "finished call");
    } else {
        tracing::info!(grpc.code = %code, time_ms, "finished call");
    }
}

impl Middleware for LoggingMiddleware {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut CallScope,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        let tags = ctx.tags();
        let span = tracing::info_span!(
            "rpc",
            service.name = self.service_name.as_str(),
            request_id = %ctx.request_id(),
            grpc.service = tags.service.as_deref().unwrap_or("unknown"),
            grpc.method = tags.method.as_deref().unwrap_or("unknown"),
            peer.address = tracing::field::Empty,
        );
        if let Some(peer) = tags.peer_addr {
            span.record("peer.address", tracing::field::display(peer));
        }

        Box::pin(
            async move {
                ctx.transition(CallState::LoggingStarted);
                tracing::debug!("started call");

                let response = next.run(ctx, request).await;

                let status = response.rpc_status();
                let outcome = ctx.record_outcome(status.code());
                ctx.transition(CallState::Completed);

                let time_ms = outcome.duration.as_secs_f64() * 1000.0;
                emit_finish(status.code(), status.message(), time_ms);

                let (service, method) = self.metric_labels(ctx.tags());
                let labels = [
                    ("service", service),
                    ("method", method),
                    ("code", status.code().name().to_string()),
                ];
                metrics::counter!(CALLS_TOTAL, &labels).increment(1);
                metrics::histogram!(CALL_DURATION_SECONDS, &labels)
                    .record(outcome.duration.as_secs_f64());

                response
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Request as HttpRequest;
    use http_body_util::Full;
    use warden_core::Status;

    fn request() -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/users.v1.Users/Get")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn tagged_scope() -> CallScope {
        let mut ctx = CallScope::new();
        ctx.set_tags(CallTags {
            service: Some("users.v1.Users".to_string()),
            method: Some("Get".to_string()),
            peer_addr: "127.0.0.1:9000".parse().ok(),
            user_agent: None,
        });
        ctx.transition(CallState::Tagged);
        ctx.transition(CallState::SessionAttached);
        ctx
    }

    #[test]
    fn test_middleware_name() {
        let middleware = LoggingMiddleware::new("test-service");
        assert_eq!(middleware.name(), "logging");
        assert_eq!(middleware.service_name(), "test-service");
    }

    #[test]
    fn test_metric_labels_only_for_known_methods() {
        let middleware =
            LoggingMiddleware::new("test-service").with_known_methods(["/users.v1.Users/Get"]);

        let known = tagged_scope();
        assert_eq!(
            middleware.metric_labels(known.tags()),
            ("users.v1.Users".to_string(), "Get".to_string())
        );

        for n in 0..3 {
            let tags = CallTags {
                service: Some(format!("x{n}.S")),
                method: Some(format!("M{n}")),
                ..CallTags::default()
            };
            assert_eq!(
                middleware.metric_labels(&tags),
                (UNKNOWN_LABEL.to_string(), UNKNOWN_LABEL.to_string())
            );
        }

        assert_eq!(
            middleware.metric_labels(&CallTags::default()),
            (UNKNOWN_LABEL.to_string(), UNKNOWN_LABEL.to_string())
        );
    }

    #[test]
    fn test_no_known_methods_by_default() {
        let middleware = LoggingMiddleware::new("test-service");
        let (service, method) = middleware.metric_labels(tagged_scope().tags());
        assert_eq!(service, UNKNOWN_LABEL);
        assert_eq!(method, UNKNOWN_LABEL);
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(level_for(Code::Ok), Level::INFO);
        assert_eq!(level_for(Code::Unauthenticated), Level::INFO);
        assert_eq!(level_for(Code::DeadlineExceeded), Level::WARN);
        assert_eq!(level_for(Code::Unavailable), Level::WARN);
        assert_eq!(level_for(Code::Internal), Level::ERROR);
        assert_eq!(level_for(Code::Unimplemented), Level::ERROR);
    }

    #[tokio::test]
    async fn test_records_outcome_for_success() {
        let middleware = LoggingMiddleware::new("test-service");
        let mut ctx = tagged_scope();

        let next = Next::handler(|_ctx, _req| Box::pin(async { Response::ok(Bytes::new()) }));
        let response = middleware.process(&mut ctx, request(), next).await;

        assert_eq!(response.rpc_status().code(), Code::Ok);
        let outcome = ctx.outcome().unwrap();
        assert_eq!(outcome.code, Code::Ok);
    }

    #[tokio::test]
    async fn test_records_outcome_for_rejection() {
        let middleware = LoggingMiddleware::new("test-service");
        let mut ctx = tagged_scope();

        let next = Next::handler(|ctx, _req| {
            ctx.transition(CallState::Rejected);
            Box::pin(async { Response::rpc(&Status::unauthenticated("no credential")) })
        });
        middleware.process(&mut ctx, request(), next).await;

        assert_eq!(ctx.outcome().map(|o| o.code), Some(Code::Unauthenticated));
        assert_eq!(ctx.state(), CallState::Completed);
    }

    #[tokio::test]
    async fn test_moves_state_to_logging_started() {
        let middleware = LoggingMiddleware::new("test-service");
        let mut ctx = tagged_scope();

        let next = Next::handler(|ctx, _req| {
            let state = ctx.state();
            Box::pin(async move {
                assert_eq!(state, CallState::LoggingStarted);
                Response::ok(Bytes::new())
            })
        });
        middleware.process(&mut ctx, request(), next).await;
    }
}
