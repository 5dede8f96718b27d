//! Behavior of the recording credential service double.

use warden_core::Code;
use warden_credentials::{
    AuthService, CredentialError, GetAugmentedAuthTokenRequest, GetAugmentedAuthTokenResponse,
    LoginReply, LoginRequest, MockAuthService, RecordedCall,
};

fn reply(token: &str) -> LoginReply {
    LoginReply {
        token: token.to_string(),
        expires_at: 1_900_000_000,
    }
}

#[tokio::test]
async fn consumes_expectations_in_order() {
    let mock = MockAuthService::new();
    mock.expect_login(Ok(reply("first")))
        .expect_get_augmented_token(Ok(GetAugmentedAuthTokenResponse {
            token: "augmented".to_string(),
            expires_at: 1_900_000_100,
        }));

    let login = mock.login(LoginRequest::new("idp-token")).await.unwrap();
    assert_eq!(login.token, "first");

    let augmented = mock
        .get_augmented_token(GetAugmentedAuthTokenRequest::new(login.token.clone()))
        .await
        .unwrap();
    assert_eq!(augmented.token, "augmented");

    assert!(mock.is_satisfied());
    assert_eq!(
        mock.calls(),
        vec![
            RecordedCall::Login(LoginRequest::new("idp-token")),
            RecordedCall::GetAugmentedToken(GetAugmentedAuthTokenRequest::new("first")),
        ]
    );
}

#[tokio::test]
async fn unexpected_call_fails_and_keeps_queue() {
    let mock = MockAuthService::new();
    mock.expect_login(Ok(reply("kept")));

    let err = mock
        .get_augmented_token(GetAugmentedAuthTokenRequest::new("t"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CredentialError::UnexpectedCall {
            method: "GetAugmentedToken"
        }
    ));
    assert_eq!(mock.remaining(), 1);

    let login = mock.login(LoginRequest::new("a")).await.unwrap();
    assert_eq!(login.token, "kept");
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn call_without_expectation_fails() {
    let mock = MockAuthService::new();
    let err = mock.login(LoginRequest::new("a")).await.unwrap_err();
    assert_eq!(err.code(), Code::Internal);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn queued_error_is_returned() {
    let mock = MockAuthService::new();
    mock.expect_login(Err(CredentialError::Timeout));

    let err = mock.login(LoginRequest::new("a")).await.unwrap_err();
    assert_eq!(err.code(), Code::Unavailable);
    assert!(mock.is_satisfied());
}

#[tokio::test]
async fn usable_as_trait_object() {
    let mock = std::sync::Arc::new(MockAuthService::new());
    mock.expect_login(Ok(reply("dyn")));

    let service: std::sync::Arc<dyn AuthService> = mock.clone();
    let login = service.login(LoginRequest::new("a")).await.unwrap();
    assert_eq!(login.token, "dyn");
    assert!(mock.is_satisfied());
}
