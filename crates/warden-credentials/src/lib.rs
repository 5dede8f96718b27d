//! Credential service contract for Warden.
//!
//! The credential service issues the bearer tokens that the server later
//! verifies. This crate defines its contract ([`AuthService`]) together with
//! two implementations:
//!
//! - [`HttpAuthClient`] - JSON over HTTP with an explicit timeout; transport
//!   failures fail closed as `Unavailable`
//! - [`MockAuthService`] - an expectation-queue test double that records calls
//!
//! # Example
//!
//! ```
//! use warden_credentials::{AuthService, LoginReply, LoginRequest, MockAuthService};
//!
//! # async fn demo() {
//! let mock = MockAuthService::new();
//! mock.expect_login(Ok(LoginReply {
//!     token: "session-token".to_string(),
//!     expires_at: 1_700_000_000,
//! }));
//!
//! let reply = mock
//!     .login(LoginRequest::new("access-token"))
//!     .await
//!     .unwrap();
//! assert_eq!(reply.token, "session-token");
//! assert!(mock.is_satisfied());
//! # }
//! ```

#![warn(missing_docs)]

mod client;
mod error;
mod mock;
mod types;

use std::future::Future;
use std::pin::Pin;

pub use client::{HttpAuthClient, DEFAULT_TIMEOUT, GET_AUGMENTED_TOKEN_PATH, LOGIN_PATH};
pub use error::CredentialError;
pub use mock::{MockAuthService, RecordedCall};
pub use types::{
    GetAugmentedAuthTokenRequest, GetAugmentedAuthTokenResponse, LoginReply, LoginRequest,
};

/// A boxed future returned by [`AuthService`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result alias for credential service calls.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Contract of the credential service.
pub trait AuthService: Send + Sync {
    /// Exchanges an identity-provider access token for a session token.
    fn login(&self, request: LoginRequest) -> BoxFuture<'_, CredentialResult<LoginReply>>;

    /// Exchanges a session token for one augmented with extra claims.
    fn get_augmented_token(
        &self,
        request: GetAugmentedAuthTokenRequest,
    ) -> BoxFuture<'_, CredentialResult<GetAugmentedAuthTokenResponse>>;
}
