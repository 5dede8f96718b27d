//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every pipeline stage
//! implements. A stage does its work on the call, then either continues with
//! [`Next::run`] or short-circuits by returning its own response.
//!
//! # Example
//!
//! ```ignore
//! use warden_core::CallScope;
//! use warden_middleware::{BoxFuture, Middleware, Next, Request, Response};
//!
//! struct AuditMiddleware;
//!
//! impl Middleware for AuditMiddleware {
//!     fn name(&self) -> &'static str {
//!         "audit"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut CallScope,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             println!("call: {}", ctx.request_id());
//!             next.run(ctx, request).await
//!         })
//!     }
//! }
//! ```

use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use warden_core::CallScope;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core middleware trait.
///
/// Middleware receives the call scope mutably, the incoming request, and a
/// [`Next`] callback to invoke the rest of the chain.
///
/// # Invariants
///
/// - Middleware MUST call `next.run()` at most once
/// - Middleware that does not call `next.run()` rejects the call and MUST
///   return a response carrying a non-OK status
/// - Middleware MUST NOT modify the pipeline order
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this stage.
    ///
    /// Used for logging and for [`Pipeline::stage_names`](crate::Pipeline::stage_names).
    fn name(&self) -> &'static str;

    /// Processes the call through this stage.
    fn process<'a>(
        &'a self,
        ctx: &'a mut CallScope,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// Callback to invoke the next stage in the chain.
///
/// Consumed on use, so the rest of the chain runs at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(Box<dyn FnOnce(&mut CallScope, Request) -> BoxFuture<'static, Response> + Send + 'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given middleware.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut CallScope, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next stage or the handler.
    pub async fn run(self, ctx: &mut CallScope, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::Request as HttpRequest;
    use http_body_util::Full;
    use warden_core::{Code, Status};

    struct TestMiddleware {
        name: &'static str,
    }

    impl Middleware for TestMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut CallScope,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move { next.run(ctx, request).await })
        }
    }

    struct RejectingMiddleware;

    impl Middleware for RejectingMiddleware {
        fn name(&self) -> &'static str {
            "reject"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut CallScope,
            _request: Request,
            _next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move { Response::rpc(&Status::unauthenticated("no")) })
        }
    }

    fn request() -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/test.v1.Test/Echo")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok_handler<'a>() -> Next<'a> {
        Next::handler(|_ctx, _req| Box::pin(async { Response::ok(Bytes::from("OK")) }))
    }

    #[test]
    fn test_middleware_name() {
        let mw = TestMiddleware { name: "test" };
        assert_eq!(mw.name(), "test");
    }

    #[tokio::test]
    async fn test_next_handler() {
        let mut ctx = CallScope::new();
        let response = ok_handler().run(&mut ctx, request()).await;
        assert_eq!(response.rpc_status().code(), Code::Ok);
    }

    #[tokio::test]
    async fn test_middleware_chain() {
        let mw1 = TestMiddleware { name: "first" };
        let mw2 = TestMiddleware { name: "second" };

        let mut ctx = CallScope::new();
        let next = Next::new(&mw1, Next::new(&mw2, ok_handler()));

        let response = next.run(&mut ctx, request()).await;
        assert_eq!(response.rpc_status().code(), Code::Ok);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let reached = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = reached.clone();
        let handler = Next::handler(move |_ctx, _req| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Box::pin(async { Response::ok(Bytes::new()) })
        });

        let mut ctx = CallScope::new();
        let response = Next::new(&RejectingMiddleware, handler)
            .run(&mut ctx, request())
            .await;

        assert_eq!(response.rpc_status().code(), Code::Unauthenticated);
        assert!(!reached.load(std::sync::atomic::Ordering::SeqCst));
    }
}
