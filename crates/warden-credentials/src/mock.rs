//! Recording test double for the credential service.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::{
    AuthService, BoxFuture, CredentialError, CredentialResult, GetAugmentedAuthTokenRequest,
    GetAugmentedAuthTokenResponse, LoginReply, LoginRequest,
};

/// A call observed by [`MockAuthService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// `Login` was called.
    Login(LoginRequest),
    /// `GetAugmentedToken` was called.
    GetAugmentedToken(GetAugmentedAuthTokenRequest),
}

impl RecordedCall {
    /// Method name of the call.
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Login(_) => "Login",
            Self::GetAugmentedToken(_) => "GetAugmentedToken",
        }
    }
}

enum Expectation {
    Login(CredentialResult<LoginReply>),
    GetAugmentedToken(CredentialResult<GetAugmentedAuthTokenResponse>),
}

/// [`AuthService`] test double.
///
/// Expectations are consumed in the order they were queued. A call that does
/// not match the next expectation fails with
/// [`CredentialError::UnexpectedCall`] and leaves the queue untouched. Every
/// call is recorded, matched or not.
#[derive(Default)]
pub struct MockAuthService {
    expectations: Mutex<VecDeque<Expectation>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockAuthService {
    /// Creates a mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the result of the next `Login` call.
    pub fn expect_login(&self, result: CredentialResult<LoginReply>) -> &Self {
        self.expectations
            .lock()
            .push_back(Expectation::Login(result));
        self
    }

    /// Queues the result of the next `GetAugmentedToken` call.
    pub fn expect_get_augmented_token(
        &self,
        result: CredentialResult<GetAugmentedAuthTokenResponse>,
    ) -> &Self {
        self.expectations
            .lock()
            .push_back(Expectation::GetAugmentedToken(result));
        self
    }

    /// All calls observed so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls observed so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of expectations not yet consumed.
    pub fn remaining(&self) -> usize {
        self.expectations.lock().len()
    }

    /// Whether every queued expectation has been consumed.
    pub fn is_satisfied(&self) -> bool {
        self.remaining() == 0
    }

    fn next_login(&self, request: LoginRequest) -> CredentialResult<LoginReply> {
        self.calls.lock().push(RecordedCall::Login(request));

        let mut expectations = self.expectations.lock();
        match expectations.pop_front() {
            Some(Expectation::Login(result)) => result,
            Some(other) => {
                expectations.push_front(other);
                Err(CredentialError::UnexpectedCall { method: "Login" })
            }
            None => Err(CredentialError::UnexpectedCall { method: "Login" }),
        }
    }

    fn next_augmented(
        &self,
        request: GetAugmentedAuthTokenRequest,
    ) -> CredentialResult<GetAugmentedAuthTokenResponse> {
        self.calls
            .lock()
            .push(RecordedCall::GetAugmentedToken(request));

        let mut expectations = self.expectations.lock();
        match expectations.pop_front() {
            Some(Expectation::GetAugmentedToken(result)) => result,
            Some(other) => {
                expectations.push_front(other);
                Err(CredentialError::UnexpectedCall {
                    method: "GetAugmentedToken",
                })
            }
            None => Err(CredentialError::UnexpectedCall {
                method: "GetAugmentedToken",
            }),
        }
    }
}

impl std::fmt::Debug for MockAuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAuthService")
            .field("remaining", &self.remaining())
            .field("calls", &self.call_count())
            .finish()
    }
}

impl AuthService for MockAuthService {
    fn login(&self, request: LoginRequest) -> BoxFuture<'_, CredentialResult<LoginReply>> {
        let result = self.next_login(request);
        Box::pin(async move { result })
    }

    fn get_augmented_token(
        &self,
        request: GetAugmentedAuthTokenRequest,
    ) -> BoxFuture<'_, CredentialResult<GetAugmentedAuthTokenResponse>> {
        let result = self.next_augmented(request);
        Box::pin(async move { result })
    }
}
