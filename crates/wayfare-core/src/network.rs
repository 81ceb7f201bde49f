// SPDX-License-Identifier: Apache-2.0

//! Network availability provider.
//!
//! The orchestrator reads connectivity through the [`NetworkStatus`] trait so
//! hosts can plug in their own listener and tests can flip it by hand.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Process-wide online/offline signal.
pub trait NetworkStatus: Send + Sync {
    /// Returns the current connectivity.
    fn is_online(&self) -> bool;

    /// Subscribes to connectivity changes.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// In-memory [`NetworkStatus`] fed by a transport-level listener.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl NetworkMonitor {
    /// Creates a monitor with the given initial connectivity.
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Records a connectivity change. Repeated values are not re-broadcast.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            debug!(online, "Network status changed");
        }
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NetworkStatus for NetworkMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Waits until `status` reports online.
///
/// Returns `false` if `cancel` fires first or the provider goes away.
pub async fn wait_until_online(status: &dyn NetworkStatus, cancel: &CancellationToken) -> bool {
    let mut rx = status.subscribe();
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        result = rx.wait_for(|online| *online) => result.is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_monitor_reports_changes() {
        let monitor = NetworkMonitor::new(true);
        let mut rx = monitor.subscribe();
        assert!(monitor.is_online());

        monitor.set_online(false);
        assert!(!monitor.is_online());
        assert!(rx.has_changed().unwrap_or(false));
        assert!(!*rx.borrow_and_update());

        // Same value again is not a change.
        monitor.set_online(false);
        assert!(!rx.has_changed().unwrap_or(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_immediately_when_online() {
        let monitor = NetworkMonitor::new(true);
        let token = CancellationToken::new();
        assert!(wait_until_online(&monitor, &token).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_resumes_when_back_online() {
        let monitor = NetworkMonitor::new(false);
        let token = CancellationToken::new();
        let flipper = monitor.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            flipper.set_online(true);
        });
        assert!(wait_until_online(&monitor, &token).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_is_cancellable() {
        let monitor = NetworkMonitor::new(false);
        let token = CancellationToken::new();
        token.cancel();
        assert!(!wait_until_online(&monitor, &token).await);
    }
}
