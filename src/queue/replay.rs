//! Queue replay on connectivity regain.
//!
//! Replay policy: when the connectivity monitor reports a disconnected to
//! connected transition, the queue is drained once and traversed by priority
//! (critical first), FIFO within equal priority. Each operation is handed to
//! the domain manager registered for its entity kind. Transient failures put
//! the operation back at the tail of the queue; permanent failures are
//! dropped with a warning.

use std::sync::Arc;

use async_trait::async_trait;

use super::{OfflineQueue, QueuedOperation};
use crate::connectivity::ConnectivityMonitor;
use crate::error::Result;
use crate::record::EntityKind;

/// Replays queued operations for one entity kind. Implemented by the domain
/// managers.
#[async_trait]
pub trait ReplayHandler: Send + Sync {
    /// Entity kind this handler owns.
    fn entity(&self) -> EntityKind;

    /// Replays one operation through the normal remote path.
    async fn replay(&self, op: &QueuedOperation) -> Result<()>;
}

/// Drives queue replay when connectivity returns.
pub struct QueueReplayer {
    connectivity: ConnectivityMonitor,
    queue: OfflineQueue,
    handlers: Vec<Arc<dyn ReplayHandler>>,
}

impl QueueReplayer {
    pub fn new(connectivity: ConnectivityMonitor, queue: OfflineQueue) -> Self {
        Self {
            connectivity,
            queue,
            handlers: Vec::new(),
        }
    }

    /// Registers a handler for its entity kind.
    pub fn register(&mut self, handler: Arc<dyn ReplayHandler>) {
        self.handlers.push(handler);
    }

    /// Drains the queue once and replays everything, by priority then FIFO.
    ///
    /// Returns the number of operations replayed successfully. Does nothing
    /// while disconnected. Operations that hit a transient failure (or find
    /// the network gone again mid-flush) are re-queued; operations whose
    /// failure is permanent, or that have no registered handler, are dropped.
    pub async fn flush(&self) -> usize {
        if !self.connectivity.is_connected() {
            return 0;
        }

        let mut ops = self.queue.drain();
        if ops.is_empty() {
            return 0;
        }
        // stable sort: FIFO within a priority class
        ops.sort_by_key(|op| op.priority);
        tracing::info!(pending = ops.len(), "replaying offline queue");

        let mut replayed = 0;
        for op in ops {
            if !self.connectivity.is_connected() {
                self.queue.requeue(op);
                continue;
            }

            let handler = self
                .handlers
                .iter()
                .find(|h| h.entity() == op.kind.entity);
            let handler = match handler {
                Some(h) => h,
                None => {
                    tracing::warn!(kind = %op.kind, "no replay handler registered, dropping");
                    continue;
                }
            };

            match handler.replay(&op).await {
                Ok(()) => {
                    tracing::debug!(kind = %op.kind, "replayed queued operation");
                    replayed += 1;
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!(kind = %op.kind, error = %e, "replay failed, re-queueing");
                    self.queue.requeue(op);
                }
                Err(e) => {
                    tracing::warn!(kind = %op.kind, error = %e, "dropping unreplayable operation");
                }
            }
        }
        replayed
    }

    /// Spawns the background task that flushes on every disconnected to
    /// connected edge. The task ends when the connectivity monitor is
    /// dropped.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let mut rx = self.connectivity.subscribe();
        tokio::spawn(async move {
            let mut was_connected = *rx.borrow();
            if was_connected {
                // catch anything queued before the task started
                self.flush().await;
            }
            while rx.changed().await.is_ok() {
                let connected = *rx.borrow_and_update();
                if connected && !was_connected {
                    self.flush().await;
                }
                was_connected = connected;
            }
        })
    }
}

impl std::fmt::Debug for QueueReplayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueReplayer")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
