//! Fixed-order interceptor pipeline.
//!
//! Every call flows through the same sequence:
//!
//! 1. **Tags** - request id, service/method, peer address, user agent
//! 2. **Session injection** - attach an empty [`SessionContext`](warden_core::SessionContext)
//! 3. **Log start** - open the call span and emit the start event
//! 4. **Authentication** - verify the bearer credential
//! 5. **Handler** - only reached after successful authentication
//! 6. **Log end** - emit the finish event with code and duration
//!
//! Log start and log end are the two halves of one logging stage that wraps
//! everything after it, so rejected calls are logged too.
//!
//! The pipeline is built once and shared behind an `Arc`. It holds no per-call
//! state and is safe to drive from many tasks at once.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};
use std::sync::Arc;
use std::time::Instant;
use warden_core::{CallScope, CallState, CancellationToken, Status};

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The fixed-order middleware pipeline.
///
/// # Example
///
/// ```ignore
/// use warden_middleware::pipeline::Pipeline;
/// use warden_middleware::stages::{TagsMiddleware, SessionMiddleware};
///
/// let pipeline = Pipeline::builder()
///     .add_stage(TagsMiddleware::new())
///     .add_stage(SessionMiddleware::new())
///     .build();
///
/// let response = pipeline.process(CallScope::new(), request, handler).await;
/// ```
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Processes a call through the entire pipeline.
    ///
    /// Returns the response together with the final call scope, so callers
    /// can inspect the recorded state and outcome.
    pub async fn process<H>(
        &self,
        mut ctx: CallScope,
        request: Request,
        handler: H,
    ) -> (Response, CallScope)
    where
        H: FnOnce(&mut CallScope, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        let next = self.build_chain(handler);
        let response = next.run(&mut ctx, request).await;
        (response, ctx)
    }

    /// Builds the middleware chain for a call, back to front.
    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut CallScope, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::handler(move |ctx: &mut CallScope, request: Request| {
            match terminated(ctx) {
                Some(status) => {
                    ctx.transition(CallState::Rejected);
                    let response = Response::rpc(&status);
                    Box::pin(async move { response }) as BoxFuture<'static, Response>
                }
                None => {
                    ctx.transition(CallState::HandlerInvoked);
                    let deadline = ctx.deadline();
                    let cancellation = ctx.cancellation().clone();
                    let call = handler(ctx, request);
                    Box::pin(bounded(call, deadline, cancellation))
                }
            }
        });

        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }

        next
    }

    /// Returns the names of all middleware stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of middleware stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Returns the status a call must end with if it may no longer proceed.
pub(crate) fn terminated(ctx: &CallScope) -> Option<Status> {
    if ctx.is_cancelled() {
        Some(Status::cancelled("call cancelled"))
    } else if ctx.deadline_exceeded() {
        Some(Status::deadline_exceeded("deadline exceeded"))
    } else {
        None
    }
}

/// Runs a handler future until it finishes or the call is cancelled or expires.
///
/// Stages wrapping the handler always see the terminal status.
async fn bounded(
    call: BoxFuture<'static, Response>,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
) -> Response {
    let expiry = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        () = cancellation.cancelled() => Response::rpc(&Status::cancelled("call cancelled")),
        () = expiry => Response::rpc(&Status::deadline_exceeded("deadline exceeded")),
        response = call => response,
    }
}

/// Builder for constructing a [`Pipeline`].
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty pipeline builder.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage. Stages run in the order they are added.
    #[must_use]
    pub fn add_stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pipeline position marker.
///
/// This enum represents the fixed order of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: Call tag extraction
    Tags = 1,
    /// Stage 2: Session context injection
    SessionInjection = 2,
    /// Stage 3: Call-start logging
    LogStart = 3,
    /// Stage 4: Bearer authentication
    Authentication = 4,
    /// Stage 5: Handler invocation
    Handler = 5,
    /// Stage 6: Call-finish logging
    LogEnd = 6,
}

impl Stage {
    /// Returns true if this stage runs before the handler.
    #[must_use]
    pub const fn is_pre_handler(self) -> bool {
        (self as u8) < (Self::Handler as u8)
    }

    /// Returns true if this stage runs after the handler.
    #[must_use]
    pub const fn is_post_handler(self) -> bool {
        (self as u8) > (Self::Handler as u8)
    }

    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tags => "tags",
            Self::SessionInjection => "session",
            Self::LogStart => "log_start",
            Self::Authentication => "auth",
            Self::Handler => "handler",
            Self::LogEnd => "log_end",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 6] {
        [
            Self::Tags,
            Self::SessionInjection,
            Self::LogStart,
            Self::Authentication,
            Self::Handler,
            Self::LogEnd,
        ]
    }
}
