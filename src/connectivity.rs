//! Connectivity monitor: the single source of truth for "can we reach the
//! remote store right now".
//!
//! The monitor itself never probes the network. A platform reachability
//! source feeds it through [`ConnectivityMonitor::set_connected`]; everything
//! else reads the cached flag synchronously or subscribes to changes.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared connectivity state backed by a watch channel.
///
/// Cloning is cheap; all clones observe the same state. Construct one at
/// process start and hand it to every manager rather than reaching for a
/// global.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with an initial reachability state.
    pub fn new(initially_connected: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_connected);
        Self { tx: Arc::new(tx) }
    }

    /// Returns the current reachability state, synchronously.
    pub fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    /// Updates the reachability state. Called by the platform signal source.
    pub fn set_connected(&self, connected: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current != connected {
                *current = connected;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::debug!(connected, "connectivity changed");
        }
    }

    /// Subscribes to connectivity changes.
    ///
    /// The receiver observes the current value immediately and every
    /// subsequent transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert!(ConnectivityMonitor::new(true).is_connected());
        assert!(!ConnectivityMonitor::new(false).is_connected());
    }

    #[test]
    fn test_clones_share_state() {
        let monitor = ConnectivityMonitor::new(true);
        let clone = monitor.clone();

        monitor.set_connected(false);
        assert!(!clone.is_connected());
    }

    #[tokio::test]
    async fn test_subscribe_sees_transitions() {
        let monitor = ConnectivityMonitor::new(false);
        let mut rx = monitor.subscribe();
        assert!(!*rx.borrow());

        monitor.set_connected(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_redundant_updates_do_not_notify() {
        let monitor = ConnectivityMonitor::new(true);
        let mut rx = monitor.subscribe();
        rx.mark_unchanged();

        monitor.set_connected(true);
        assert!(!rx.has_changed().unwrap());
    }
}
