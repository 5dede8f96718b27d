//! Token signing key material.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};

/// Claims every accepted token must carry.
const REQUIRED_CLAIMS: &[&str] = &["exp", "sub", "iss"];

/// Process-wide verification key for bearer tokens.
///
/// Built once from configuration and shared read-only across calls, usually
/// behind an `Arc`. Tokens are HMAC-SHA256 signed.
///
/// The `Debug` output never contains the secret.
#[derive(Clone)]
pub struct SigningKey {
    decoding: DecodingKey,
    issuer: String,
    audience: Option<String>,
    leeway_secs: u64,
}

impl SigningKey {
    /// Creates a key from a shared HMAC secret and the expected issuer.
    #[must_use]
    pub fn from_secret(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: None,
            leeway_secs: 0,
        }
    }

    /// Requires tokens to carry the given audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the clock-skew allowance applied to `exp`.
    #[must_use]
    pub const fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Returns the expected issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the expected audience, if any.
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    pub(crate) const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    pub(crate) fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(REQUIRED_CLAIMS);
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud.as_str()]),
            None => validation.validate_aud = false,
        }
        validation
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let key = SigningKey::from_secret(b"super-secret-value", "warden");
        let debug = format!("{key:?}");
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("warden"));
    }

    #[test]
    fn test_validation_settings() {
        let key = SigningKey::from_secret(b"k", "issuer-a").with_leeway(5);
        let validation = key.validation();
        assert_eq!(validation.leeway, 5);
        assert!(!validation.validate_aud);
        assert_eq!(validation.algorithms, vec![Algorithm::HS256]);
    }

    #[test]
    fn test_audience_enables_validation() {
        let key = SigningKey::from_secret(b"k", "issuer-a").with_audience("svc");
        assert_eq!(key.audience(), Some("svc"));
        assert!(key.validation().validate_aud);
    }
}
