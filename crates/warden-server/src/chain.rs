//! Assembly of the call pipeline and transport security.
//!
//! [`ChainBuilder`] turns a [`WardenConfig`] into the fixed-order stage
//! sequence every call runs through:
//!
//! 1. tags
//! 2. session injection
//! 3. logging (start, and finish on the way out)
//! 4. authentication
//! 5. handler
//!
//! and, when transport security is enabled, loads the PEM certificate chain
//! and private key. Any failure aborts construction; no partially built
//! chain is ever returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use warden_config::{ConfigError, WardenConfig};
use warden_core::SigningKey;
use warden_middleware::{
    AuthMiddleware, LoggingMiddleware, Pipeline, SessionMiddleware, TagsMiddleware,
};

use crate::error::ServerError;

/// The assembled call chain.
#[derive(Clone)]
pub struct Chain {
    pipeline: Arc<Pipeline>,
    tls: Option<RustlsConfig>,
}

impl Chain {
    /// The shared pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Transport security material, if enabled.
    #[must_use]
    pub fn tls(&self) -> Option<&RustlsConfig> {
        self.tls.as_ref()
    }

    /// Returns `true` if calls are served over TLS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.tls.is_some()
    }

    pub(crate) fn into_parts(self) -> (Arc<Pipeline>, Option<RustlsConfig>) {
        (self.pipeline, self.tls)
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("pipeline", &self.pipeline)
            .field("secure", &self.is_secure())
            .finish()
    }
}

/// Builds the [`Chain`] from configuration.
///
/// # Example
///
/// ```rust
/// use warden_config::WardenConfig;
/// use warden_server::ChainBuilder;
///
/// # tokio_test::block_on(async {
/// let mut config = WardenConfig::development();
/// config.auth.signing_key = Some("dev-secret".to_string());
///
/// let chain = ChainBuilder::new(&config).build().await.unwrap();
/// assert_eq!(
///     chain.pipeline().stage_names(),
///     vec!["tags", "session", "logging", "auth"]
/// );
/// assert!(!chain.is_secure());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    config: WardenConfig,
    methods: Vec<String>,
}

impl ChainBuilder {
    /// Creates a builder for `config`.
    #[must_use]
    pub fn new(config: &WardenConfig) -> Self {
        Self {
            config: config.clone(),
            methods: Vec::new(),
        }
    }

    /// Sets the registered `/{service}/{method}` paths.
    ///
    /// Only these get their own labels on call metrics.
    #[must_use]
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Resolves the process signing key.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if no signing secret is configured or the
    /// key file cannot be read.
    pub fn signing_key(&self) -> Result<SigningKey, ServerError> {
        let auth = &self.config.auth;
        let secret = auth.signing_secret()?;

        let mut key =
            SigningKey::from_secret(&secret, auth.issuer.clone()).with_leeway(auth.leeway_secs);
        if let Some(audience) = &auth.audience {
            key = key.with_audience(audience.clone());
        }
        Ok(key)
    }

    /// Builds the pipeline in its fixed order.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the signing key cannot be resolved.
    pub fn pipeline(&self) -> Result<Pipeline, ServerError> {
        let key = Arc::new(self.signing_key()?);

        Ok(Pipeline::builder()
            .add_stage(
                TagsMiddleware::new().with_trusted_request_ids(self.config.server.trust_request_id),
            )
            .add_stage(SessionMiddleware::new())
            .add_stage(
                LoggingMiddleware::new(self.config.service_name.clone())
                    .with_known_methods(self.methods.iter().cloned()),
            )
            .add_stage(AuthMiddleware::new(key))
            .build())
    }

    /// Loads transport security material when enabled.
    ///
    /// Returns `Ok(None)` without touching the filesystem when security is
    /// disabled.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Tls` if security is enabled and either path is
    /// unset, missing, or not valid PEM.
    pub async fn tls(&self) -> Result<Option<RustlsConfig>, ServerError> {
        let security = &self.config.security;
        if !security.enabled {
            tracing::debug!("transport security disabled");
            return Ok(None);
        }

        let cert = required_path(security.tls_cert.as_deref(), "security.tls_cert")?;
        let key = required_path(security.tls_key.as_deref(), "security.tls_key")?;

        tracing::info!(
            tls_cert_file = %cert.display(),
            tls_key_file = %key.display(),
            "loading transport security material"
        );

        for path in [&cert, &key] {
            if !path.exists() {
                tracing::error!(path = %path.display(), "TLS file not found");
                return Err(ServerError::tls(path.clone(), "file not found"));
            }
        }

        match RustlsConfig::from_pem_file(&cert, &key).await {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                tracing::error!(
                    tls_cert_file = %cert.display(),
                    tls_key_file = %key.display(),
                    error = %e,
                    "failed to load TLS certificate"
                );
                Err(ServerError::tls(cert, e.to_string()))
            }
        }
    }

    /// Builds the chain.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` for missing signing material and
    /// `ServerError::Tls` for unusable certificate material.
    pub async fn build(self) -> Result<Chain, ServerError> {
        let pipeline = self.pipeline().map_err(|e| {
            tracing::error!(error = %e, "failed to build call pipeline");
            e
        })?;
        let tls = self.tls().await?;

        tracing::debug!(stages = ?pipeline.stage_names(), secure = tls.is_some(), "call chain built");

        Ok(Chain {
            pipeline: Arc::new(pipeline),
            tls,
        })
    }
}

fn required_path(path: Option<&Path>, field: &'static str) -> Result<PathBuf, ServerError> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => {
            tracing::error!(field, "transport security enabled without a path");
            Err(ServerError::tls(
                PathBuf::new(),
                ConfigError::missing_field(field).to_string(),
            ))
        }
    }
}
