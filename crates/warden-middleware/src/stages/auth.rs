//! Bearer authentication middleware.
//!
//! Verifies the `authorization: bearer <token>` credential of every call
//! against the process signing key and records the result in the call's
//! [`SessionContext`](warden_core::SessionContext).
//!
//! # Failure handling
//!
//! | Condition | Code |
//! |---|---|
//! | No credential, or scheme is not exactly `bearer` | `UNAUTHENTICATED` |
//! | No session context attached | `INTERNAL` |
//! | Malformed, expired, wrongly signed or wrongly issued token | `UNAUTHENTICATED` |
//! | Call cancelled after authentication | `CANCELLED` |
//! | Deadline passed after authentication | `DEADLINE_EXCEEDED` |
//!
//! A rejected call never reaches the handler. There is no retry.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::terminated;
use crate::types::{Request, Response, ResponseExt};
use http::header::AUTHORIZATION;
use http::HeaderMap;
use std::sync::Arc;
use warden_core::{CallScope, CallState, SigningKey, Status};

/// The only accepted authorization scheme, matched case-sensitively.
pub const BEARER_SCHEME: &str = "bearer";

/// Extracts the bearer token from call metadata.
///
/// The header value must be the literal `bearer`, one space, then a non-empty
/// token with no further leading whitespace.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, Status> {
    let unauthenticated = || Status::unauthenticated("request unauthenticated with bearer");

    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(unauthenticated)?;

    let token = value
        .strip_prefix(BEARER_SCHEME)
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or_else(unauthenticated)?;

    if token.is_empty() || token.starts_with(char::is_whitespace) {
        return Err(unauthenticated());
    }
    Ok(token)
}

/// Middleware that authenticates every call with a bearer token.
#[derive(Debug, Clone)]
pub struct AuthMiddleware {
    key: Arc<SigningKey>,
}

impl AuthMiddleware {
    /// Creates an authentication middleware using the shared signing key.
    #[must_use]
    pub fn new(key: Arc<SigningKey>) -> Self {
        Self { key }
    }

    fn authenticate(&self, ctx: &mut CallScope, headers: &HeaderMap) -> Result<(), Status> {
        let token = bearer_token(headers)?;

        let session = ctx.session_mut().map_err(|err| {
            tracing::error!(error = %err, "authentication stage ran without a session context");
            Status::from(err)
        })?;

        session.authenticate(&self.key, token).map_err(|err| {
            tracing::debug!(reason = %err.kind(), "bearer credential rejected");
            Status::from(err)
        })?;

        if let Some(subject) = session.subject() {
            tracing::debug!(subject, "bearer credential accepted");
        }
        Ok(())
    }
}

impl Middleware for AuthMiddleware {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut CallScope,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if let Err(status) = self.authenticate(ctx, request.headers()) {
                ctx.transition(CallState::Rejected);
                return Response::rpc(&status);
            }
            ctx.transition(CallState::Authenticated);

            if let Some(status) = terminated(ctx) {
                ctx.transition(CallState::Rejected);
                return Response::rpc(&status);
            }

            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Request as HttpRequest;
    use http_body_util::Full;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};
    use warden_core::{CancellationToken, Claims, Code, SessionContext};

    const SECRET: &[u8] = b"auth-stage-secret";
    const ISSUER: &str = "warden-test";

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn mint(sub: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: now() + 600,
            iss: ISSUER.to_string(),
            iat: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn middleware() -> AuthMiddleware {
        AuthMiddleware::new(Arc::new(SigningKey::from_secret(SECRET, ISSUER)))
    }

    fn request(authorization: Option<&str>) -> Request {
        let mut builder = HttpRequest::builder().method("POST").uri("/a.B/C");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    fn scope_with_session() -> CallScope {
        CallScope::new().with_session(SessionContext::new())
    }

    fn counting_next<'a>(calls: Arc<AtomicUsize>) -> Next<'a> {
        Next::handler(move |ctx, _req| {
            calls.fetch_add(1, Ordering::SeqCst);
            let subject = ctx
                .session()
                .ok()
                .and_then(|s| s.subject().map(ToString::to_string))
                .unwrap_or_default();
            Box::pin(async move { Response::ok(Bytes::from(subject)) })
        })
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers("bearer abc.def")).unwrap(), "abc.def");
        assert!(bearer_token(&HeaderMap::new()).is_err());
        assert!(bearer_token(&headers("Bearer abc")).is_err());
        assert!(bearer_token(&headers("basic abc")).is_err());
        assert!(bearer_token(&headers("bearer")).is_err());
        assert!(bearer_token(&headers("bearerabc")).is_err());
        assert!(bearer_token(&headers("bearer  abc")).is_err());
    }

    #[test]
    fn test_bearer_failure_is_unauthenticated() {
        let status = bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
    }

    #[tokio::test]
    async fn test_missing_credential_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctx = scope_with_session();

        let response = middleware()
            .process(&mut ctx, request(None), counting_next(calls.clone()))
            .await;

        assert_eq!(response.rpc_status().code(), Code::Unauthenticated);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!ctx.session().unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn test_valid_credential_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctx = scope_with_session();
        let token = format!("bearer {}", mint("alice"));

        let response = middleware()
            .process(&mut ctx, request(Some(&token)), counting_next(calls.clone()))
            .await;

        assert_eq!(response.rpc_status().code(), Code::Ok);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(ctx.session().unwrap().is_authenticated());
        assert_eq!(ctx.session().unwrap().subject(), Some("alice"));
    }

    #[tokio::test]
    async fn test_missing_session_is_internal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctx = CallScope::new();
        let token = format!("bearer {}", mint("alice"));

        let response = middleware()
            .process(&mut ctx, request(Some(&token)), counting_next(calls.clone()))
            .await;

        let status = response.rpc_status();
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().contains("missing session context"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_token_message_hides_token() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctx = scope_with_session();

        let response = middleware()
            .process(
                &mut ctx,
                request(Some("bearer secret-looking-garbage")),
                counting_next(calls.clone()),
            )
            .await;

        let status = response.rpc_status();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert!(status.message().starts_with("invalid auth token"));
        assert!(!status.message().contains("secret-looking-garbage"));
    }

    #[tokio::test]
    async fn test_cancelled_after_authentication() {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        token.cancel();
        let mut ctx = scope_with_session().with_cancellation(token);
        let header = format!("bearer {}", mint("alice"));

        let response = middleware()
            .process(&mut ctx, request(Some(&header)), counting_next(calls.clone()))
            .await;

        assert_eq!(response.rpc_status().code(), Code::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
