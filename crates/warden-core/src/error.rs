//! Error and status types for Warden.
//!
//! Two layers of errors exist:
//!
//! - [`AuthError`] is produced by the session layer when a credential cannot
//!   be accepted or when the session context is absent from a call scope.
//! - [`Status`] is what a caller sees. Every rejected call terminates with a
//!   [`Code`] plus a diagnostic message that never carries key material or
//!   token internals.
//!
//! # Code mapping
//!
//! | `AuthErrorKind` | `Code` |
//! |---|---|
//! | `Malformed` | `Unauthenticated` |
//! | `Expired` | `Unauthenticated` |
//! | `BadSignature` | `Unauthenticated` |
//! | `InvalidIssuer` | `Unauthenticated` |
//! | `AlreadyAttempted` | `Internal` |
//! | `MissingSessionContext` | `Internal` |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`Status`].
pub type StatusResult<T> = Result<T, Status>;

/// The reason a credential was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    /// The token could not be parsed or is missing required claims.
    Malformed,
    /// The token's expiry timestamp is in the past.
    Expired,
    /// The token's signature does not verify against the signing key.
    BadSignature,
    /// The token was issued by an unexpected issuer.
    InvalidIssuer,
    /// An authentication attempt was already made on this session.
    AlreadyAttempted,
    /// No session context is attached to the call scope.
    MissingSessionContext,
}

impl AuthErrorKind {
    /// Returns `true` if the failure is the caller's fault.
    ///
    /// Programmer errors (pipeline-assembly defects) return `false`.
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(
            self,
            Self::Malformed | Self::Expired | Self::BadSignature | Self::InvalidIssuer
        )
    }

    /// Returns the status code this failure surfaces as.
    #[must_use]
    pub const fn code(self) -> Code {
        if self.is_client_error() {
            Code::Unauthenticated
        } else {
            Code::Internal
        }
    }

    /// Returns a short, stable, log-safe description.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed token",
            Self::Expired => "token expired",
            Self::BadSignature => "bad token signature",
            Self::InvalidIssuer => "unexpected token issuer",
            Self::AlreadyAttempted => "session already authenticated",
            Self::MissingSessionContext => "missing session context",
        }
    }
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authentication failure.
///
/// The `Display` output is derived from the kind only, so it is always safe to
/// include in a client-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct AuthError {
    /// Why authentication failed.
    pub kind: AuthErrorKind,
}

impl AuthError {
    /// Creates an error of the given kind.
    #[must_use]
    pub const fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a `MissingSessionContext` error.
    #[must_use]
    pub const fn missing_session_context() -> Self {
        Self::new(AuthErrorKind::MissingSessionContext)
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> AuthErrorKind {
        self.kind
    }
}

impl From<AuthErrorKind> for AuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        let kind = match err.kind() {
            ErrorKind::ExpiredSignature => AuthErrorKind::Expired,
            ErrorKind::InvalidSignature => AuthErrorKind::BadSignature,
            ErrorKind::InvalidIssuer => AuthErrorKind::InvalidIssuer,
            // Everything else (bad encoding, wrong algorithm, missing claims,
            // audience mismatch, not-yet-valid) is treated as malformed.
            _ => AuthErrorKind::Malformed,
        };
        Self::new(kind)
    }
}

/// Status codes reported to callers.
///
/// Numeric values follow the gRPC status code registry so that standard
/// clients can interpret the `grpc-status` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Code {
    /// The call completed successfully.
    Ok = 0,
    /// The call was cancelled before it completed.
    Cancelled = 1,
    /// Unknown error.
    Unknown = 2,
    /// The request payload was invalid.
    InvalidArgument = 3,
    /// The call's deadline expired.
    DeadlineExceeded = 4,
    /// The requested method does not exist.
    NotFound = 5,
    /// The caller lacks permission.
    PermissionDenied = 7,
    /// The method is not implemented.
    Unimplemented = 12,
    /// An internal invariant was violated.
    Internal = 13,
    /// A dependency is unavailable.
    Unavailable = 14,
    /// The caller could not be authenticated.
    Unauthenticated = 16,
}

impl Code {
    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a numeric code. Unrecognised values map to [`Code::Unknown`].
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::Cancelled,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            7 => Self::PermissionDenied,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            16 => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }

    /// Returns `true` if the code indicates a server-side fault.
    #[must_use]
    pub const fn is_server_error(self) -> bool {
        matches!(
            self,
            Self::Unknown | Self::Internal | Self::Unavailable | Self::Unimplemented
        )
    }

    /// Returns the canonical upper-snake-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A call outcome as reported to the caller.
///
/// # Example
///
/// ```
/// use warden_core::{Code, Status};
///
/// let status = Status::unauthenticated("missing bearer credential");
/// assert_eq!(status.code(), Code::Unauthenticated);
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    /// Creates a status with a code and message.
    #[must_use]
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates an `OK` status.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(Code::Ok, "")
    }

    /// Creates an `UNAUTHENTICATED` status.
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(Code::Unauthenticated, message)
    }

    /// Creates an `INTERNAL` status.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    /// Creates an `UNAVAILABLE` status.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    /// Creates a `CANCELLED` status.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(Code::Cancelled, message)
    }

    /// Creates a `DEADLINE_EXCEEDED` status.
    #[must_use]
    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(Code::DeadlineExceeded, message)
    }

    /// Creates an `UNIMPLEMENTED` status.
    #[must_use]
    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(Code::Unimplemented, message)
    }

    /// Creates an `INVALID_ARGUMENT` status.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    /// Returns the status code.
    #[must_use]
    pub const fn code(&self) -> Code {
        self.code
    }

    /// Returns the diagnostic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        match err.kind {
            AuthErrorKind::MissingSessionContext => {
                Self::internal(format!("missing session context: {err}"))
            }
            kind if kind.is_client_error() => {
                Self::unauthenticated(format!("invalid auth token: {err}"))
            }
            _ => Self::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_unauthenticated() {
        for kind in [
            AuthErrorKind::Malformed,
            AuthErrorKind::Expired,
            AuthErrorKind::BadSignature,
            AuthErrorKind::InvalidIssuer,
        ] {
            assert!(kind.is_client_error());
            assert_eq!(kind.code(), Code::Unauthenticated);
            assert_eq!(Status::from(AuthError::new(kind)).code(), Code::Unauthenticated);
        }
    }

    #[test]
    fn test_missing_session_context_is_internal() {
        let status = Status::from(AuthError::missing_session_context());
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().contains("missing session context"));
    }

    #[test]
    fn test_already_attempted_is_not_a_client_error() {
        assert!(!AuthErrorKind::AlreadyAttempted.is_client_error());
        assert_eq!(AuthErrorKind::AlreadyAttempted.code(), Code::Internal);
    }

    #[test]
    fn test_code_round_trips_numeric_value() {
        for code in [
            Code::Ok,
            Code::Cancelled,
            Code::DeadlineExceeded,
            Code::Internal,
            Code::Unavailable,
            Code::Unauthenticated,
        ] {
            assert_eq!(Code::from_u8(code.as_u8()), code);
        }
        assert_eq!(Code::from_u8(99), Code::Unknown);
    }

    #[test]
    fn test_code_numeric_values_match_grpc() {
        assert_eq!(Code::Unauthenticated.as_u8(), 16);
        assert_eq!(Code::Internal.as_u8(), 13);
        assert_eq!(Code::DeadlineExceeded.as_u8(), 4);
    }

    #[test]
    fn test_status_display() {
        let status = Status::unauthenticated("missing bearer credential");
        assert_eq!(status.to_string(), "UNAUTHENTICATED: missing bearer credential");
    }

    #[test]
    fn test_server_error_classification() {
        assert!(Code::Internal.is_server_error());
        assert!(Code::Unavailable.is_server_error());
        assert!(!Code::Unauthenticated.is_server_error());
        assert!(!Code::Ok.is_server_error());
    }

    #[test]
    fn test_jwt_error_kind_mapping() {
        use jsonwebtoken::errors::{Error, ErrorKind};

        let expired: AuthError = Error::from(ErrorKind::ExpiredSignature).into();
        assert_eq!(expired.kind(), AuthErrorKind::Expired);

        let bad_sig: AuthError = Error::from(ErrorKind::InvalidSignature).into();
        assert_eq!(bad_sig.kind(), AuthErrorKind::BadSignature);

        let issuer: AuthError = Error::from(ErrorKind::InvalidIssuer).into();
        assert_eq!(issuer.kind(), AuthErrorKind::InvalidIssuer);

        let token: AuthError = Error::from(ErrorKind::InvalidToken).into();
        assert_eq!(token.kind(), AuthErrorKind::Malformed);
    }
}
