//! The Warden RPC server.
//!
//! Every inbound call is a `POST /{package.Service}/{Method}` carrying opaque
//! bytes. The server collects the body, derives the call's deadline and
//! cancellation, and drives it through the shared [`Pipeline`]. Status is
//! reported in the `grpc-status` / `grpc-message` headers.
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_config::ConfigLoader;
//! use warden_server::{Server, ServiceRegistry};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().with_env_prefix("WARDEN").load()?;
//!
//! let mut registry = ServiceRegistry::new();
//! registry.register("/demo.Echo/Echo", |_ctx, body| async move { Ok(body) });
//!
//! let server = Server::new(&config, registry).await?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum_server::tls_rustls::RustlsConfig;
use bytes::Bytes;
use http::Method;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use tokio::net::TcpListener;
use warden_config::{ConfigError, WardenConfig};
use warden_core::{CallScope, Status};
use warden_middleware::{BoxFuture, Pipeline, Request, Response, ResponseExt};

use crate::chain::ChainBuilder;
use crate::deadline;
use crate::error::ServerError;
use crate::handler::ServiceRegistry;
use crate::shutdown::{CallTracker, ShutdownSignal};

/// The Warden RPC server.
pub struct Server {
    addr: SocketAddr,
    pipeline: Arc<Pipeline>,
    registry: Arc<ServiceRegistry>,
    tls: Option<RustlsConfig>,
    request_timeout: Duration,
    shutdown_timeout: Duration,
    shutdown: ShutdownSignal,
    tracker: CallTracker,
}

impl Server {
    /// Constructs a server from configuration.
    ///
    /// Validates the configuration, resolves the signing key, builds the
    /// call pipeline and, when enabled, loads transport security.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` for invalid configuration or missing
    /// signing material and `ServerError::Tls` for unusable certificates.
    pub async fn new(config: &WardenConfig, registry: ServiceRegistry) -> Result<Self, ServerError> {
        config.validate()?;
        let addr: SocketAddr = config.server.addr.parse().map_err(|_| {
            ConfigError::invalid_value(
                "server.addr",
                format!("invalid socket address: {}", config.server.addr),
            )
        })?;

        let (pipeline, tls) = ChainBuilder::new(config)
            .with_methods(registry.methods())
            .build()
            .await?
            .into_parts();

        Ok(Self {
            addr,
            pipeline,
            registry: Arc::new(registry),
            tls,
            request_timeout: Duration::from_millis(config.server.request_timeout_ms),
            shutdown_timeout: Duration::from_secs(config.server.shutdown_timeout_secs),
            shutdown: ShutdownSignal::new(),
            tracker: CallTracker::new(),
        })
    }

    /// Configured listen address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns `true` if calls are served over TLS.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.tls.is_some()
    }

    /// The shared call pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Upper bound on any call's deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Signal whose triggering cancels calls and stops serving.
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Number of calls currently being processed.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight()
    }

    /// Processes one call through the pipeline.
    ///
    /// The call's deadline is its `grpc-timeout`, capped by the configured
    /// request timeout. The pipeline stops the handler at that deadline and
    /// the call finishes with `DeadlineExceeded`. The peer address, if known,
    /// is read from the request's `SocketAddr` extension.
    pub async fn call(&self, request: Request) -> Response {
        let deadline = Instant::now() + deadline::call_timeout(request.headers(), self.request_timeout);
        self.dispatch(request, deadline, None).await
    }

    /// Drives a call through the pipeline.
    ///
    /// With `failure` set, the call still passes every stage but ends with
    /// that status instead of reaching the registered handler.
    async fn dispatch(&self, request: Request, deadline: Instant, failure: Option<Status>) -> Response {
        let _guard = self.tracker.acquire();

        let ctx = CallScope::new()
            .with_deadline(deadline)
            .with_cancellation(self.shutdown.child_token());

        let registry = Arc::clone(&self.registry);
        let handler = move |ctx: &mut CallScope, request: Request| -> BoxFuture<'static, Response> {
            match failure {
                Some(status) => {
                    Box::pin(async move { Response::rpc(&status) }) as BoxFuture<'static, Response>
                }
                None => Box::pin(invoke(registry, ctx.clone(), request)),
            }
        };

        let (response, _ctx) = self.pipeline.process(ctx, request, handler).await;
        response
    }

    /// Accepts one transport-level request.
    async fn handle(&self, request: http::Request<Incoming>, peer: SocketAddr) -> Response {
        let (mut parts, body) = request.into_parts();

        if parts.method != Method::POST {
            tracing::debug!(peer.address = %peer, method = %parts.method, "rejected non-POST request");
            return Response::rpc(&Status::unimplemented(format!(
                "method {} not supported",
                parts.method
            )));
        }

        let timeout = deadline::call_timeout(&parts.headers, self.request_timeout);
        let deadline = Instant::now() + timeout;

        let (body, failure) = match tokio::time::timeout(timeout, body.collect()).await {
            Ok(Ok(collected)) => (collected.to_bytes(), None),
            Ok(Err(e)) => {
                tracing::warn!(peer.address = %peer, error = %e, "failed to read request body");
                (Bytes::new(), Some(Status::invalid_argument("failed to read request body")))
            }
            Err(_) => {
                tracing::warn!(peer.address = %peer, "request body read timed out");
                (Bytes::new(), Some(Status::deadline_exceeded("request body read timed out")))
            }
        };

        parts.extensions.insert(peer);
        self.dispatch(Request::from_parts(parts, Full::new(body)), deadline, failure)
            .await
    }

    /// Serves until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if the address cannot be bound, or
    /// `ServerError::Io` on a fatal serving error.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Serves until `shutdown` is triggered.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if the address cannot be bound, or
    /// `ServerError::Io` on a fatal serving error.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;
        self.serve_on(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` is triggered.
    ///
    /// Triggering `shutdown` also cancels calls that have not yet reached
    /// their handler. In-flight calls get the configured drain timeout.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Io` on a fatal serving error.
    pub async fn serve_on(
        mut self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let std_listener = listener.into_std()?;
        let tls = self.tls.take();
        let secure = tls.is_some();
        let drain = self.shutdown_timeout;
        let tracker = self.tracker.clone();

        // Calls must observe the signal this server is stopped by.
        self.shutdown = shutdown.clone();

        let handle = axum_server::Handle::new();
        {
            let handle = handle.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                shutdown.recv().await;
                tracing::info!("shutdown signal received, draining calls");
                handle.graceful_shutdown(Some(drain));
            });
        }

        tracing::info!(
            addr = %addr,
            secure,
            methods = ?self.registry.methods(),
            "serving calls"
        );

        let server = Arc::new(self);
        let make_service = tower::service_fn(move |peer: SocketAddr| {
            let server = Arc::clone(&server);
            async move {
                Ok::<_, Infallible>(tower::service_fn(move |request: http::Request<Incoming>| {
                    let server = Arc::clone(&server);
                    async move { Ok::<_, Infallible>(server.handle(request, peer).await) }
                }))
            }
        });

        match tls {
            Some(tls) => {
                axum_server::from_tcp_rustls(std_listener, tls)
                    .handle(handle)
                    .serve(make_service)
                    .await?;
            }
            None => {
                axum_server::from_tcp(std_listener)
                    .handle(handle)
                    .serve(make_service)
                    .await?;
            }
        }

        tokio::select! {
            () = tracker.wait_idle() => {
                tracing::info!("all calls drained");
            }
            () = tokio::time::sleep(drain) => {
                tracing::warn!(in_flight = tracker.in_flight(), "drain timeout reached");
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("addr", &self.addr)
            .field("secure", &self.is_secure())
            .field("pipeline", &self.pipeline)
            .field("registry", &self.registry)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Runs the registered handler for an authenticated call.
async fn invoke(registry: Arc<ServiceRegistry>, scope: CallScope, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let Some(handler) = registry.get(&path) else {
        return Response::rpc(&Status::unimplemented(format!("unknown method {path}")));
    };

    let body = match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };

    match handler(scope, body).await {
        Ok(reply) => Response::ok(reply),
        Err(status) => Response::rpc(&status),
    }
}
