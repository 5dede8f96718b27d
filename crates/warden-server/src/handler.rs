//! Unary method handlers.
//!
//! A handler receives the call's [`CallScope`] by value, with the
//! authenticated session attached, and the opaque request bytes. The
//! [`ServiceRegistry`] maps full method paths (`/package.Service/Method`)
//! to handlers.
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use warden_core::{CallScope, SessionContext, Status};
//! use warden_server::ServiceRegistry;
//!
//! let mut registry = ServiceRegistry::new();
//! registry.register("/demo.Greeter/Hello", |ctx: CallScope, _body: Bytes| async move {
//!     SessionContext::retrieve(&ctx)
//!         .map(|session| Bytes::from(session.subject().unwrap_or_default().to_string()))
//!         .map_err(Status::from)
//! });
//!
//! assert!(registry.contains("/demo.Greeter/Hello"));
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use warden_core::{CallScope, Status};
use warden_middleware::BoxFuture;

/// Type-erased unary handler.
pub type BoxedHandler =
    Arc<dyn Fn(CallScope, Bytes) -> BoxFuture<'static, Result<Bytes, Status>> + Send + Sync>;

/// Routing table from full method path to handler.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    handlers: HashMap<String, BoxedHandler>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `path`, replacing any previous one.
    pub fn register<F, Fut>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(CallScope, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Bytes, Status>> + Send + 'static,
    {
        let handler: BoxedHandler = Arc::new(move |ctx, body| Box::pin(handler(ctx, body)));
        self.handlers.insert(path.into(), handler);
        self
    }

    /// Returns the handler for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<BoxedHandler> {
        self.handlers.get(path).cloned()
    }

    /// Returns `true` if a handler is registered for `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.handlers.contains_key(path)
    }

    /// Number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no methods are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered method paths, sorted.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}
