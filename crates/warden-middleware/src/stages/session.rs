//! Session injection middleware.
//!
//! Attaches a fresh, unauthenticated [`SessionContext`] to every call. The
//! authentication stage fills it in and the handler reads it, so this stage
//! must run before authentication.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use warden_core::{CallScope, CallState, SessionContext};

/// Middleware that attaches an empty session context to each call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionMiddleware;

impl SessionMiddleware {
    /// Creates the session injection middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for SessionMiddleware {
    fn name(&self) -> &'static str {
        "session"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut CallScope,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            ctx.attach_session(SessionContext::new());
            ctx.transition(CallState::SessionAttached);
            next.run(ctx, request).await
        })
    }
}
