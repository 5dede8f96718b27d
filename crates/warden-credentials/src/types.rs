//! Request and response messages of the credential service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Login request carrying the identity-provider access token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Access token issued by the identity provider.
    pub access_token: String,
}

impl LoginRequest {
    /// Creates a login request.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

/// Login reply carrying the session token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginReply {
    /// Signed session token to present as a bearer credential.
    pub token: String,
    /// Expiry of `token`, in seconds since the Unix epoch.
    pub expires_at: i64,
}

/// Request for an augmented token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAugmentedAuthTokenRequest {
    /// Session token to augment.
    pub token: String,
}

impl GetAugmentedAuthTokenRequest {
    /// Creates an augmentation request.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

/// Augmented token response.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAugmentedAuthTokenResponse {
    /// Augmented token.
    pub token: String,
    /// Expiry of `token`, in seconds since the Unix epoch.
    pub expires_at: i64,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Debug for LoginReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginReply")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl fmt::Debug for GetAugmentedAuthTokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetAugmentedAuthTokenRequest")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Debug for GetAugmentedAuthTokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetAugmentedAuthTokenResponse")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
