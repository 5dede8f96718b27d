//! Per-call context types.
//!
//! The [`CallScope`] carries all per-call state through the interceptor
//! pipeline and into handlers. It is created by the server for each inbound
//! call, threaded by `&mut` through every stage, and handed by value to the
//! handler.

use crate::error::{AuthError, Code};
use crate::session::SessionContext;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A unique identifier for each call, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it suitable for log correlation.
///
/// # Example
///
/// ```
/// use warden_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Descriptive tags extracted from an inbound call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallTags {
    /// Fully-qualified service name (e.g. `auth.v1.AuthService`).
    pub service: Option<String>,
    /// Method name (e.g. `Login`).
    pub method: Option<String>,
    /// Remote peer address, when the transport knows it.
    pub peer_addr: Option<SocketAddr>,
    /// The caller's `user-agent` header.
    pub user_agent: Option<String>,
}

impl CallTags {
    /// Returns the full method path `/{service}/{method}` if both parts are known.
    #[must_use]
    pub fn full_method(&self) -> Option<String> {
        match (&self.service, &self.method) {
            (Some(service), Some(method)) => Some(format!("/{service}/{method}")),
            _ => None,
        }
    }
}

/// Lifecycle of a single call through the pipeline.
///
/// ```text
/// Received → Tagged → SessionAttached → LoggingStarted
///     → Authenticated → HandlerInvoked → Completed
///     → Rejected → Completed
/// ```
///
/// Any state before `HandlerInvoked` may also move straight to `Rejected` (a
/// stage short-circuited the call). `Completed` is reachable only from
/// `Rejected` and `HandlerInvoked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// The call has arrived but no stage has run.
    Received,
    /// Call tags have been extracted.
    Tagged,
    /// An empty session context has been attached.
    SessionAttached,
    /// The call-start log event has been emitted.
    LoggingStarted,
    /// The bearer credential was accepted.
    Authenticated,
    /// The handler was invoked.
    HandlerInvoked,
    /// The call was terminated before reaching the handler.
    Rejected,
    /// The call-finish log event has been emitted.
    Completed,
}

impl CallState {
    /// Returns `true` if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use CallState::{
            Authenticated, Completed, HandlerInvoked, LoggingStarted, Received, Rejected,
            SessionAttached, Tagged,
        };

        match (self, next) {
            (Received, Tagged)
            | (Tagged, SessionAttached)
            | (SessionAttached, LoggingStarted)
            | (LoggingStarted, Authenticated)
            | (Authenticated, HandlerInvoked) => true,
            (Rejected | HandlerInvoked, Completed) => true,
            (Rejected | HandlerInvoked | Completed, _) => false,
            (_, Rejected) => true,
            _ => false,
        }
    }

    /// Returns `true` for the final state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// The recorded result of a finished call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOutcome {
    /// The final status code.
    pub code: Code,
    /// Wall time from call receipt to completion.
    pub duration: Duration,
}

/// Per-call context that flows through the pipeline.
///
/// `CallScope` carries:
/// - Unique request ID for log correlation
/// - Call tags (service, method, peer, user agent)
/// - The attached [`SessionContext`], once session injection has run
/// - Deadline and cancellation token
/// - Lifecycle state and, at the end, the recorded outcome
///
/// # Example
///
/// ```
/// use warden_core::{CallScope, CallState};
///
/// let scope = CallScope::new();
/// assert_eq!(scope.state(), CallState::Received);
/// assert!(scope.session().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct CallScope {
    request_id: RequestId,
    tags: CallTags,
    session: Option<SessionContext>,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
    state: CallState,
    outcome: Option<CallOutcome>,
    started_at: Instant,
}

impl CallScope {
    /// Creates a new call scope with a fresh request ID and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a new call scope with the specified request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            tags: CallTags::default(),
            session: None,
            deadline: None,
            cancellation: CancellationToken::new(),
            state: CallState::Received,
            outcome: None,
            started_at: Instant::now(),
        }
    }

    /// Sets the deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns a derived scope carrying `session`, replacing any existing one.
    #[must_use]
    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = Some(session);
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Replaces the request ID, e.g. with one propagated by the caller.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// Returns the call tags.
    #[must_use]
    pub const fn tags(&self) -> &CallTags {
        &self.tags
    }

    /// Replaces the call tags.
    pub fn set_tags(&mut self, tags: CallTags) {
        self.tags = tags;
    }

    /// Attaches a session context in place.
    pub fn attach_session(&mut self, session: SessionContext) {
        self.session = Some(session);
    }

    /// Returns `true` if a session context is attached.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the attached session context.
    ///
    /// Fails with `MissingSessionContext` if session injection did not run.
    pub fn session(&self) -> Result<&SessionContext, AuthError> {
        self.session
            .as_ref()
            .ok_or_else(AuthError::missing_session_context)
    }

    /// Returns the attached session context mutably.
    pub fn session_mut(&mut self) -> Result<&mut SessionContext, AuthError> {
        self.session
            .as_mut()
            .ok_or_else(AuthError::missing_session_context)
    }

    /// Returns the deadline, if one is set.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` if the deadline has passed.
    #[must_use]
    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns `true` if the call has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> CallState {
        self.state
    }

    /// Moves the call to `next`.
    ///
    /// Returns `false` and leaves the state unchanged if the transition is
    /// not legal.
    pub fn transition(&mut self, next: CallState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    /// Returns the recorded outcome, if the call has finished.
    #[must_use]
    pub const fn outcome(&self) -> Option<CallOutcome> {
        self.outcome
    }

    /// Records the outcome of the call.
    pub fn record_outcome(&mut self, code: Code) -> CallOutcome {
        let outcome = CallOutcome {
            code,
            duration: self.elapsed(),
        };
        self.outcome = Some(outcome);
        outcome
    }

    /// Returns the time elapsed since the call was received.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for CallScope {
    fn default() -> Self {
        Self::new()
    }
}
