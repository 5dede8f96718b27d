//! Call tagging middleware.
//!
//! First stage of every call. It assigns the request id and records the
//! descriptive tags that later stages and log events refer to:
//!
//! - RPC service and method, parsed from the `/{package.Service}/{Method}` path
//! - Peer address, taken from a [`SocketAddr`] request extension set by the server
//! - The `user-agent` header
//!
//! The request id is echoed back in the `x-request-id` response header.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use http::header::{HeaderValue, USER_AGENT};
use std::net::SocketAddr;
use uuid::Uuid;
use warden_core::{CallScope, CallState, CallTags, RequestId};

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that assigns the request id and extracts call tags.
///
/// Tags are descriptive only. A path that does not look like an RPC method
/// leaves service and method unset; routing decides what happens next.
#[derive(Debug, Clone, Default)]
pub struct TagsMiddleware {
    /// Whether to adopt an incoming `x-request-id` header.
    trust_incoming: bool,
}

impl TagsMiddleware {
    /// Creates a tagging middleware that always generates request ids.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether valid incoming request ids are adopted.
    ///
    /// Use this for services that sit behind a trusted proxy.
    #[must_use]
    pub fn with_trusted_request_ids(mut self, trust: bool) -> Self {
        self.trust_incoming = trust;
        self
    }

    fn extract_request_id(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }

        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(RequestId::from_uuid)
    }
}

/// Splits `/{service}/{method}` into its two parts.
///
/// Returns `None` unless there are exactly two non-empty segments.
pub fn parse_method_path(path: &str) -> Option<(&str, &str)> {
    let (service, method) = path.strip_prefix('/')?.split_once('/')?;
    if service.is_empty() || method.is_empty() || method.contains('/') {
        return None;
    }
    Some((service, method))
}

fn extract_tags(request: &Request) -> CallTags {
    let (service, method) = parse_method_path(request.uri().path())
        .map_or((None, None), |(s, m)| (Some(s.to_string()), Some(m.to_string())));

    CallTags {
        service,
        method,
        peer_addr: request.extensions().get::<SocketAddr>().copied(),
        user_agent: request
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string),
    }
}

impl Middleware for TagsMiddleware {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut CallScope,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if let Some(request_id) = self.extract_request_id(&request) {
                ctx.set_request_id(request_id);
            }
            ctx.set_tags(extract_tags(&request));
            ctx.transition(CallState::Tagged);

            let request_id = ctx.request_id();
            let mut response = next.run(ctx, request).await;

            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }

            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::Request as HttpRequest;
    use http_body_util::Full;

    fn create_request(path: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri(path)
            .header(USER_AGENT, "grpc-rust/1.0")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn create_request_with_id(request_id: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/auth.v1.AuthService/Login")
            .header(REQUEST_ID_HEADER, request_id)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn create_handler() -> impl FnOnce(&mut CallScope, Request) -> BoxFuture<'static, Response> {
        |_ctx, _req| Box::pin(async { Response::ok(Bytes::from("OK")) })
    }

    #[test]
    fn test_parse_method_path() {
        assert_eq!(
            parse_method_path("/auth.v1.AuthService/Login"),
            Some(("auth.v1.AuthService", "Login"))
        );
        assert_eq!(parse_method_path("/Login"), None);
        assert_eq!(parse_method_path("auth/Login"), None);
        assert_eq!(parse_method_path("//Login"), None);
        assert_eq!(parse_method_path("/svc/"), None);
        assert_eq!(parse_method_path("/a/b/c"), None);
    }

    #[tokio::test]
    async fn test_extracts_tags() {
        let middleware = TagsMiddleware::new();
        let mut ctx = CallScope::new();
        let mut request = create_request("/auth.v1.AuthService/Login");
        let peer: SocketAddr = "10.0.0.7:5555".parse().unwrap();
        request.extensions_mut().insert(peer);

        let next = Next::handler(create_handler());
        middleware.process(&mut ctx, request, next).await;

        let tags = ctx.tags();
        assert_eq!(tags.service.as_deref(), Some("auth.v1.AuthService"));
        assert_eq!(tags.method.as_deref(), Some("Login"));
        assert_eq!(tags.peer_addr, Some(peer));
        assert_eq!(tags.user_agent.as_deref(), Some("grpc-rust/1.0"));
        assert_eq!(ctx.state(), CallState::Tagged);
    }

    #[tokio::test]
    async fn test_non_rpc_path_leaves_method_unset() {
        let middleware = TagsMiddleware::new();
        let mut ctx = CallScope::new();

        let next = Next::handler(create_handler());
        middleware
            .process(&mut ctx, create_request("/healthz"), next)
            .await;

        assert!(ctx.tags().service.is_none());
        assert!(ctx.tags().method.is_none());
    }

    #[tokio::test]
    async fn test_sets_request_id_header() {
        let middleware = TagsMiddleware::new();
        let mut ctx = CallScope::new();

        let next = Next::handler(create_handler());
        let response = middleware
            .process(&mut ctx, create_request("/a.B/C"), next)
            .await;

        let header_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(ctx.request_id().to_string(), header_id);
    }

    #[tokio::test]
    async fn test_ignores_incoming_id_when_not_trusted() {
        let middleware = TagsMiddleware::new();
        let mut ctx = CallScope::new();
        let incoming_id = "01234567-89ab-7def-8123-456789abcdef";

        let next = Next::handler(create_handler());
        let response = middleware
            .process(&mut ctx, create_request_with_id(incoming_id), next)
            .await;

        let header_id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert_ne!(header_id, incoming_id);
    }

    #[tokio::test]
    async fn test_uses_incoming_id_when_trusted() {
        let middleware = TagsMiddleware::new().with_trusted_request_ids(true);
        let mut ctx = CallScope::new();
        let incoming_id = "01234567-89ab-7def-8123-456789abcdef";

        let next = Next::handler(create_handler());
        middleware
            .process(&mut ctx, create_request_with_id(incoming_id), next)
            .await;

        assert_eq!(ctx.request_id().to_string(), incoming_id);
    }

    #[tokio::test]
    async fn test_ignores_invalid_incoming_id() {
        let middleware = TagsMiddleware::new().with_trusted_request_ids(true);
        let mut ctx = CallScope::new();
        let original = ctx.request_id();

        let next = Next::handler(create_handler());
        middleware
            .process(&mut ctx, create_request_with_id("not-a-uuid"), next)
            .await;

        assert_eq!(ctx.request_id(), original);
    }
}
