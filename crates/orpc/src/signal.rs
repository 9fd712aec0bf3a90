//! Caller-driven cancellation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Why a wait on a signal finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationReason {
    /// The signal was cancelled
    Cancelled,
    /// The timeout elapsed first
    Timeout,
}

#[derive(Debug, Default)]
struct SignalState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Advisory cancellation signal.
///
/// Clones share state: cancelling one handle is observed by every other.
/// The engine only forwards the signal; handlers and middleware decide
/// whether to stop early.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    state: Arc<SignalState>,
}

impl CancellationSignal {
    /// Create a new, uncancelled signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the signal and wake every waiter
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    /// Check if cancelled
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancelled
    pub async fn cancelled(&self) {
        let notified = self.state.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent `cancel` is not missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Wait until cancelled or until `timeout` elapses.
    pub async fn cancelled_or_timeout(&self, timeout: Duration) -> CancellationReason {
        tokio::select! {
            _ = self.cancelled() => CancellationReason::Cancelled,
            _ = tokio::time::sleep(timeout) => CancellationReason::Timeout,
        }
    }
}
