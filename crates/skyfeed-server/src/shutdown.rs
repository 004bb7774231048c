//! Graceful shutdown signal handling.
//!
//! [`ShutdownSignal`] stops the accept loop, either on SIGTERM/SIGINT or
//! when triggered by hand (tests, embedding applications).
//! [`ConnectionTracker`] counts open connections so the server can wait
//! for them, bounded by the shutdown timeout.
//!
//! # Example
//!
//! ```rust,ignore
//! use skyfeed_server::ShutdownSignal;
//!
//! // Wait for shutdown signal
//! let shutdown = ShutdownSignal::new();
//! shutdown.recv().await;
//!
//! // Or use with a timeout
//! use std::time::Duration;
//! tokio::select! {
//!     _ = shutdown.recv() => println!("Shutdown signal received"),
//!     _ = tokio::time::sleep(Duration::from_secs(60)) => println!("Timeout"),
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Notify};

/// A signal that can be used to trigger and await graceful shutdown.
///
/// `ShutdownSignal` provides a way to coordinate shutdown across
/// multiple tasks. It can be cloned and shared, and all clones
/// will receive the shutdown notification.
///
/// # Example
///
/// ```rust
/// use skyfeed_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
///
/// // Clone for use in another task
/// let shutdown_clone = shutdown.clone();
///
/// // Trigger shutdown
/// shutdown.trigger();
///
/// // Check if shutdown was triggered
/// assert!(shutdown.is_shutdown());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    /// Whether shutdown has been triggered
    triggered: Arc<AtomicBool>,

    /// Broadcast sender for notifying waiters
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Creates a new shutdown signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Triggers the shutdown signal. Idempotent.
    pub fn trigger(&self) {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let _ = self.sender.send(());
        }
    }

    /// Returns `true` if shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Completes when shutdown is triggered, immediately if it already was.
    pub async fn recv(&self) {
        let mut receiver = self.sender.subscribe();
        if self.is_shutdown() {
            return;
        }
        let _ = receiver.recv().await;
    }

    /// Creates a shutdown signal that listens for OS signals.
    ///
    /// This will trigger on SIGTERM or SIGINT (Ctrl+C). Must be called from
    /// within a Tokio runtime.
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

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for SIGTERM or SIGINT (Ctrl+C on other platforms).
///
/// If the handlers cannot be installed the error is logged and the future
/// never completes, so the server keeps running until triggered otherwise.
async fn wait_for_os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!(error = %e, "Failed to register signal handlers");
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to wait for Ctrl+C");
            return std::future::pending().await;
        }
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    }
}

/// A token that can be used to track active connections during shutdown.
///
/// When all `ConnectionToken` instances are dropped, the shutdown
/// process knows that all connections have been closed.
///
/// # Example
///
/// ```rust
/// use skyfeed_server::shutdown::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
///
/// // Acquire a token for each connection
/// let token = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
///
/// // Token is dropped, connection count decreases
/// drop(token);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a new connection tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Acquires a connection token.
    ///
    /// The token should be held for the duration of the connection.
    /// When dropped, it decrements the active connection count.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            active: Arc::clone(&self.active),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Returns the number of active connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until all connections are closed.
    ///
    /// This completes immediately if there are no active connections.
    pub async fn wait_for_shutdown(&self) {
        loop {
            let notified = self.notify.notified();
            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// A token representing an active connection.
///
/// When dropped, decrements the connection count in the tracker.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        let prev = self.active.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            self.notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_shutdown_signal_trigger() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        assert!(signal.is_shutdown());
    }

    #[test]
    fn test_shutdown_signal_trigger_idempotent() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        signal.trigger();
        signal.trigger();
        assert!(signal.is_shutdown());
    }

    #[test]
    fn test_shutdown_signal_clone() {
        let signal1 = ShutdownSignal::new();
        let signal2 = signal1.clone();

        signal1.trigger();

        assert!(signal1.is_shutdown());
        assert!(signal2.is_shutdown());
    }

    #[tokio::test]
    async fn test_shutdown_recv_completes_when_triggered() {
        let signal = ShutdownSignal::new();
        let signal_clone = signal.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signal_clone.trigger();
        });

        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .expect("recv should complete");
    }

    #[tokio::test]
    async fn test_shutdown_recv_completes_immediately_if_triggered() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        tokio::time::timeout(Duration::from_millis(10), signal.recv())
            .await
            .expect("recv should complete immediately");
    }

    #[test]
    fn test_connection_tracker_multiple() {
        let tracker = ConnectionTracker::new();
        let token1 = tracker.acquire();
        let token2 = tracker.acquire();
        let token3 = tracker.acquire();

        assert_eq!(tracker.active_connections(), 3);

        drop(token1);
        assert_eq!(tracker.active_connections(), 2);

        drop(token2);
        assert_eq!(tracker.active_connections(), 1);

        drop(token3);
        assert_eq!(tracker.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_connection_tracker_wait_for_shutdown_immediate() {
        let tracker = ConnectionTracker::new();

        tokio::time::timeout(Duration::from_millis(10), tracker.wait_for_shutdown())
            .await
            .expect("wait_for_shutdown should complete immediately");
    }

    #[tokio::test]
    async fn test_connection_tracker_wait_for_shutdown_delayed() {
        let tracker = ConnectionTracker::new();
        let token = tracker.acquire();

        let tracker_clone = tracker.clone();
        let wait_handle = tokio::spawn(async move {
            tracker_clone.wait_for_shutdown().await;
        });

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(token);
        });

        tokio::time::timeout(Duration::from_secs(1), wait_handle)
            .await
            .expect("wait should complete")
            .expect("task should not panic");
    }
}
