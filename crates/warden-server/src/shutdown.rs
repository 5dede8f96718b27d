//! Graceful shutdown signal handling.
//!
//! [`ShutdownSignal`] is backed by a [`CancellationToken`]. Every call's
//! cancellation token is a child of it, so triggering shutdown cancels
//! in-flight calls that have not yet reached their handler.
//!
//! # Example
//!
//! ```rust
//! use warden_server::ShutdownSignal;
//!
//! let shutdown = ShutdownSignal::new();
//! let call_token = shutdown.child_token();
//!
//! shutdown.trigger();
//! assert!(call_token.is_cancelled());
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use warden_core::CancellationToken;

/// A signal that can be used to trigger and await graceful shutdown.
///
/// Clones share the same underlying token.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Creates a new shutdown signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers the shutdown signal. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Returns `true` if shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when shutdown is triggered, immediately if it already was.
    pub async fn recv(&self) {
        self.token.cancelled().await;
    }

    /// Returns a token cancelled when shutdown is triggered.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Creates a shutdown signal triggered by SIGTERM or SIGINT.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let signal_clone = signal.clone();

        tokio::spawn(async move {
            wait_for_os_signal().await;
            signal_clone.trigger();
        });

        signal
    }
}

/// Waits for an OS shutdown signal (SIGTERM or SIGINT).
///
/// A signal that cannot be listened for is logged and never fires.
async fn wait_for_os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    Some(()) = sigterm.recv() => {
                        tracing::info!("received SIGTERM, initiating graceful shutdown");
                    }
                    () = received(tokio::signal::ctrl_c(), "SIGINT") => {}
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to register SIGTERM handler");
                received(tokio::signal::ctrl_c(), "SIGINT").await;
            }
        }
    }

    #[cfg(not(unix))]
    received(tokio::signal::ctrl_c(), "Ctrl+C").await;
}

/// Resolves once `listener` reports its signal.
///
/// If the listener fails, the error is logged and this never resolves.
async fn received<E: std::fmt::Display>(
    listener: impl Future<Output = Result<(), E>>,
    name: &'static str,
) {
    match listener.await {
        Ok(()) => tracing::info!(signal = name, "received signal, initiating graceful shutdown"),
        Err(e) => {
            tracing::error!(signal = name, error = %e, "failed to listen for signal");
            std::future::pending::<()>().await;
        }
    }
}

/// Tracks calls that are still being processed.
///
/// Each call holds a [`CallGuard`]; dropping the last guard wakes
/// [`CallTracker::wait_idle`].
///
/// ```rust
/// use warden_server::CallTracker;
///
/// let tracker = CallTracker::new();
/// let guard = tracker.acquire();
/// assert_eq!(tracker.in_flight(), 1);
///
/// drop(guard);
/// assert_eq!(tracker.in_flight(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallTracker {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl CallTracker {
    /// Creates a new call tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an in-flight call until the guard is dropped.
    #[must_use]
    pub fn acquire(&self) -> CallGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        CallGuard {
            active: Arc::clone(&self.active),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Returns the number of in-flight calls.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until no calls are in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.notify.notified();
            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// A registered in-flight call.
#[derive(Debug)]
pub struct CallGuard {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}
