//! HTTP client for the credential service.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{
    AuthService, BoxFuture, CredentialError, CredentialResult, GetAugmentedAuthTokenRequest,
    GetAugmentedAuthTokenResponse, LoginReply, LoginRequest,
};

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Route of the `Login` method.
pub const LOGIN_PATH: &str = "/px.services.AuthService/Login";

/// Route of the `GetAugmentedToken` method.
pub const GET_AUGMENTED_TOKEN_PATH: &str = "/px.services.AuthService/GetAugmentedToken";

/// [`AuthService`] over JSON/HTTP.
///
/// Every call is bounded by the client timeout. Timeouts and connection
/// failures surface as errors whose code is `Unavailable`; the caller never
/// proceeds as if the call had succeeded.
#[derive(Debug, Clone)]
pub struct HttpAuthClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpAuthClient {
    /// Creates a client with [`DEFAULT_TIMEOUT`].
    pub fn new(base_url: impl Into<String>) -> CredentialResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with an explicit timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> CredentialResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Base URL of the credential service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-call timeout.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call<Req, Resp>(&self, path: &'static str, body: &Req) -> CredentialResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let err = CredentialError::from_transport(e);
                tracing::warn!(method = path, error = %err, "credential service call failed");
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                method = path,
                http.status = status.as_u16(),
                "credential service rejected call"
            );
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
            });
        }

        response
            .json::<Resp>()
            .await
            .map_err(CredentialError::from_transport)
    }
}

impl AuthService for HttpAuthClient {
    fn login(&self, request: LoginRequest) -> BoxFuture<'_, CredentialResult<LoginReply>> {
        Box::pin(async move { self.call(LOGIN_PATH, &request).await })
    }

    fn get_augmented_token(
        &self,
        request: GetAugmentedAuthTokenRequest,
    ) -> BoxFuture<'_, CredentialResult<GetAugmentedAuthTokenResponse>> {
        Box::pin(async move { self.call(GET_AUGMENTED_TOKEN_PATH, &request).await })
    }
}
