//! Error types for credential service calls.

use thiserror::Error;
use warden_core::{Code, Status};

/// Errors returned by [`AuthService`](crate::AuthService) implementations.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The call did not complete within the client timeout.
    #[error("credential service timed out")]
    Timeout,

    /// The credential service could not be reached.
    #[error("credential service unreachable: {message}")]
    Connect {
        /// Error message.
        message: String,
    },

    /// The credential service answered with a non-success status.
    #[error("credential service rejected the call with HTTP {status}")]
    Rejected {
        /// HTTP status code returned by the service.
        status: u16,
    },

    /// The response body could not be decoded.
    #[error("invalid credential service response: {message}")]
    Decode {
        /// Error message.
        message: String,
    },

    /// Any other request failure.
    #[error("credential service request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The test double received a call it had no expectation for.
    #[error("unexpected call to {method}")]
    UnexpectedCall {
        /// Method that was called.
        method: &'static str,
    },
}

impl CredentialError {
    /// Create a connect error.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// RPC code this error surfaces as.
    ///
    /// Transport failures fail closed as `Unavailable`.
    #[allow(clippy::match_same_arms)]
    pub const fn code(&self) -> Code {
        match self {
            Self::Timeout | Self::Connect { .. } | Self::Request(_) => Code::Unavailable,
            Self::Rejected { status: 401 } => Code::Unauthenticated,
            Self::Rejected { status: 403 } => Code::PermissionDenied,
            Self::Rejected { status } if *status >= 500 => Code::Unavailable,
            Self::Rejected { .. } => Code::Internal,
            Self::Decode { .. } => Code::Internal,
            Self::UnexpectedCall { .. } => Code::Internal,
        }
    }

    /// Whether retrying the call could succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self.code(), Code::Unavailable)
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::connect(err.to_string())
        } else if err.is_decode() {
            Self::decode(err.to_string())
        } else {
            Self::Request(err)
        }
    }
}

impl From<CredentialError> for Status {
    fn from(err: CredentialError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}
