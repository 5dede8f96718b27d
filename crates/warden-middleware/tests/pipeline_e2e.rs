//! End-to-end pipeline integration tests.
//!
//! These tests drive the full stage sequence together:
//!
//! 1. Tags
//! 2. Session injection
//! 3. Logging (start)
//! 4. Authentication
//! 5. Handler
//! 6. Logging (finish)

use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::Request as HttpRequest;
use http_body_util::{BodyExt, Full};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use warden_core::{CallScope, CallState, Claims, Code, SigningKey};
use warden_middleware::{
    pipeline::Pipeline,
    stages::{AuthMiddleware, LoggingMiddleware, SessionMiddleware, TagsMiddleware},
    types::{Request, Response, ResponseExt},
    BoxFuture,
};

const SECRET: &[u8] = b"e2e-signing-secret";
const ISSUER: &str = "e2e-issuer";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Mints a token for `sub` signed with `secret`, expiring at `exp`.
fn mint(secret: &[u8], sub: &str, exp: u64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp,
        iss: ISSUER.to_string(),
        iat: Some(now()),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
}

fn valid_token(sub: &str) -> String {
    mint(SECRET, sub, now() + 600)
}

/// Creates a call to `/e2e.v1.Echo/WhoAmI` with an optional credential.
fn make_request(token: Option<&str>) -> Request {
    let mut builder = HttpRequest::builder()
        .method("POST")
        .uri("/e2e.v1.Echo/WhoAmI");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("bearer {token}"));
    }
    builder.body(Full::new(Bytes::new())).unwrap()
}

fn signing_key() -> Arc<SigningKey> {
    Arc::new(SigningKey::from_secret(SECRET, ISSUER))
}

/// Builds the standard pipeline.
fn build_full_pipeline() -> Pipeline {
    Pipeline::builder()
        .add_stage(TagsMiddleware::new())
        .add_stage(SessionMiddleware::new())
        .add_stage(LoggingMiddleware::new("e2e-test-service"))
        .add_stage(AuthMiddleware::new(signing_key()))
        .build()
}

/// Builds a misassembled pipeline with no session injection.
fn build_pipeline_without_session() -> Pipeline {
    Pipeline::builder()
        .add_stage(TagsMiddleware::new())
        .add_stage(LoggingMiddleware::new("e2e-test-service"))
        .add_stage(AuthMiddleware::new(signing_key()))
        .build()
}

/// Handler that echoes the authenticated subject and counts invocations.
fn whoami_handler(
    calls: Arc<AtomicUsize>,
) -> impl FnOnce(&mut CallScope, Request) -> BoxFuture<'static, Response> + Send + 'static {
    move |ctx, _req| {
        calls.fetch_add(1, Ordering::SeqCst);
        let body = ctx
            .session()
            .ok()
            .and_then(|s| s.claims())
            .map(|c| format!("{}|{}|{}", c.sub, c.iss, c.exp))
            .unwrap_or_default();
        Box::pin(async move { Response::ok(Bytes::from(body)) })
    }
}

async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_stage_order() {
    let pipeline = build_full_pipeline();
    assert_eq!(
        pipeline.stage_names(),
        vec!["tags", "session", "logging", "auth"]
    );
}

#[tokio::test]
async fn test_no_credential_is_unauthenticated_and_handler_not_called() {
    let pipeline = build_full_pipeline();
    let calls = Arc::new(AtomicUsize::new(0));

    let (response, ctx) = pipeline
        .process(CallScope::new(), make_request(None), whoami_handler(calls.clone()))
        .await;

    assert_eq!(response.rpc_status().code(), Code::Unauthenticated);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.state(), CallState::Completed);
    assert_eq!(ctx.outcome().map(|o| o.code), Some(Code::Unauthenticated));
}

#[tokio::test]
async fn test_wrong_signing_key_is_unauthenticated() {
    let pipeline = build_full_pipeline();
    let calls = Arc::new(AtomicUsize::new(0));
    let forged = mint(b"some-other-key", "mallory", now() + 600);

    let (response, ctx) = pipeline
        .process(
            CallScope::new(),
            make_request(Some(&forged)),
            whoami_handler(calls.clone()),
        )
        .await;

    assert_eq!(response.rpc_status().code(), Code::Unauthenticated);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!ctx.session().unwrap().is_authenticated());
}

#[tokio::test]
async fn test_expired_credential_is_rejected() {
    let pipeline = build_full_pipeline();
    let calls = Arc::new(AtomicUsize::new(0));
    let expired = mint(SECRET, "alice", now() - 600);

    let (response, _) = pipeline
        .process(
            CallScope::new(),
            make_request(Some(&expired)),
            whoami_handler(calls.clone()),
        )
        .await;

    assert_eq!(response.rpc_status().code(), Code::Unauthenticated);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_valid_credential_reaches_handler_with_claims() {
    let pipeline = build_full_pipeline();
    let calls = Arc::new(AtomicUsize::new(0));
    let exp = now() + 600;
    let token = mint(SECRET, "alice", exp);

    let (response, ctx) = pipeline
        .process(
            CallScope::new(),
            make_request(Some(&token)),
            whoami_handler(calls.clone()),
        )
        .await;

    assert_eq!(response.rpc_status().code(), Code::Ok);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(ctx.session().unwrap().is_authenticated());
    assert_eq!(ctx.state(), CallState::Completed);
    assert_eq!(ctx.tags().method.as_deref(), Some("WhoAmI"));
    assert_eq!(body_string(response).await, format!("alice|{ISSUER}|{exp}"));
}

#[tokio::test]
async fn test_missing_session_injection_is_internal() {
    let pipeline = build_pipeline_without_session();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let token = valid_token("alice");
        let (response, _) = pipeline
            .process(
                CallScope::new(),
                make_request(Some(&token)),
                whoami_handler(calls.clone()),
            )
            .await;

        let status = response.rpc_status();
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().contains("missing session context"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_see_only_their_own_identity() {
    let pipeline = Arc::new(build_full_pipeline());
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let pipeline = pipeline.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                let subject = format!("user-{i}");
                let token = valid_token(&subject);
                let (response, _) = pipeline
                    .process(
                        CallScope::new(),
                        make_request(Some(&token)),
                        whoami_handler(calls),
                    )
                    .await;
                (subject, body_string(response).await)
            })
        })
        .collect();

    for result in futures_util::future::join_all(tasks).await {
        let (subject, body) = result.unwrap();
        assert!(
            body.starts_with(&format!("{subject}|")),
            "{subject} saw {body}"
        );
    }
    assert_eq!(calls.load(Ordering::SeqCst), 32);
}

#[tokio::test]
async fn test_request_id_header_on_rejected_call() {
    let pipeline = build_full_pipeline();
    let calls = Arc::new(AtomicUsize::new(0));

    let (response, ctx) = pipeline
        .process(CallScope::new(), make_request(None), whoami_handler(calls))
        .await;

    let header = response.headers().get("x-request-id").unwrap();
    assert_eq!(header.to_str().unwrap(), ctx.request_id().to_string());
}

#[tokio::test]
async fn test_expired_handler_call_is_completed_with_deadline_exceeded() {
    let pipeline = build_full_pipeline();
    let token = valid_token("slow");
    let deadline = Instant::now() + Duration::from_millis(50);

    let handler = |_ctx: &mut CallScope, _req: Request| -> BoxFuture<'static, Response> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Response::ok(Bytes::from("late"))
        })
    };

    let (response, ctx) = pipeline
        .process(
            CallScope::new().with_deadline(deadline),
            make_request(Some(&token)),
            handler,
        )
        .await;

    assert_eq!(response.rpc_status().code(), Code::DeadlineExceeded);
    assert_eq!(ctx.state(), CallState::Completed);
    assert_eq!(
        ctx.outcome().map(|o| o.code),
        Some(Code::DeadlineExceeded)
    );
}
