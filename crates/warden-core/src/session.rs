//! Per-call session context.
//!
//! A [`SessionContext`] is created empty by the session-injection stage,
//! populated exactly once by the authentication stage, read by the handler,
//! and dropped with the call.

use crate::context::CallScope;
use crate::error::{AuthError, AuthErrorKind};
use crate::key::SigningKey;
use serde::{Deserialize, Serialize};

/// Decoded claims of an accepted bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the caller's identity).
    pub sub: String,
    /// Expiry as seconds since the Unix epoch.
    pub exp: u64,
    /// Issuer.
    pub iss: String,
    /// Issued-at as seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

/// Identity and authentication status for one call.
///
/// # Example
///
/// ```
/// use warden_core::SessionContext;
///
/// let session = SessionContext::new();
/// assert!(!session.is_authenticated());
/// assert!(session.claims().is_none());
/// ```
#[derive(Clone, Default)]
pub struct SessionContext {
    token: Option<String>,
    claims: Option<Claims>,
    authenticated: bool,
    attempted: bool,
}

impl SessionContext {
    /// Creates an empty, unauthenticated session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifies `token` against `key` and records the result.
    ///
    /// Checks the HS256 signature, expiry, issuer and, when the key carries
    /// one, audience. On success the decoded claims are stored and the session
    /// becomes authenticated. On failure the session stays unauthenticated.
    ///
    /// Only one attempt is allowed per session. Later calls return
    /// `AlreadyAttempted` without touching state.
    pub fn authenticate(&mut self, key: &SigningKey, token: &str) -> Result<(), AuthError> {
        if self.attempted {
            return Err(AuthError::new(AuthErrorKind::AlreadyAttempted));
        }
        self.attempted = true;
        self.token = Some(token.to_string());

        let data = jsonwebtoken::decode::<Claims>(token, key.decoding_key(), &key.validation())?;
        self.claims = Some(data.claims);
        self.authenticated = true;
        Ok(())
    }

    /// Returns a scope derived from `parent` that carries `session`.
    ///
    /// Request id, tags, deadline and cancellation are inherited unchanged.
    #[must_use]
    pub fn attach(parent: CallScope, session: Self) -> CallScope {
        parent.with_session(session)
    }

    /// Returns the session attached to `scope`.
    pub fn retrieve(scope: &CallScope) -> Result<&Self, AuthError> {
        scope.session()
    }

    /// Returns the session attached to `scope` mutably.
    pub fn retrieve_mut(scope: &mut CallScope) -> Result<&mut Self, AuthError> {
        scope.session_mut()
    }

    /// Returns `true` once a token has been accepted.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Returns `true` once `authenticate` has been called.
    #[must_use]
    pub const fn is_attempted(&self) -> bool {
        self.attempted
    }

    /// Returns the decoded claims of an accepted token.
    #[must_use]
    pub const fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// Returns the authenticated subject.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claims.as_ref().map(|c| c.sub.as_str())
    }

    /// Returns the raw credential presented by the caller.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("claims", &self.claims)
            .field("authenticated", &self.authenticated)
            .field("attempted", &self.attempted)
            .finish()
    }
}
