//! Durable offline queue for writes deferred while disconnected.
//!
//! The queue is a passive log: it performs no networking itself. Domain
//! managers enqueue serialized operations when the connectivity monitor
//! reports disconnected, and the [`replay::QueueReplayer`] drains and replays
//! them through the normal save path once connectivity returns.

mod operation;
pub mod replay;
mod store;

pub use operation::{OpAction, OperationKind, Priority, QueuedOperation};
pub use store::{QueueStore, StoreError};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Serialize;

/// Durable, priority-tagged log of deferred writes.
///
/// Cloning is cheap; all clones share one store and in-memory mirror.
/// Enqueueing never fails from the caller's point of view: a serialization
/// or I/O failure drops the operation with a warning. That is an accepted
/// consistency gap - the optimistic local state stays in place unconfirmed.
#[derive(Clone)]
pub struct OfflineQueue {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    store: QueueStore,
    ops: Vec<QueuedOperation>,
}

impl OfflineQueue {
    /// Opens the queue at a custom data directory, loading any operations
    /// that survived a previous process.
    pub fn open(data_dir: PathBuf) -> Self {
        Self::with_store(QueueStore::new(data_dir))
    }

    /// Opens the queue at the platform default data directory.
    pub fn open_default() -> Self {
        Self::with_store(QueueStore::default_location())
    }

    fn with_store(store: QueueStore) -> Self {
        let ops = match store.read_all() {
            Ok(ops) => ops,
            Err(e) => {
                tracing::warn!(error = %e, "could not load offline queue, starting empty");
                Vec::new()
            }
        };
        if !ops.is_empty() {
            tracing::info!(pending = ops.len(), "loaded offline queue from disk");
        }
        Self {
            inner: Arc::new(Mutex::new(Inner { store, ops })),
        }
    }

    /// Serializes `payload` and appends it as a new operation.
    ///
    /// Never returns an error; failures are logged and the operation is
    /// dropped.
    pub fn enqueue<P: Serialize>(&self, kind: OperationKind, priority: Priority, payload: &P) {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(%kind, error = %e, "dropping unserializable queued operation");
                return;
            }
        };
        self.push(QueuedOperation::new(kind, priority, payload));
    }

    /// Re-appends an already-built operation, e.g. after a replay attempt
    /// found the network gone again. The original timestamp is kept.
    pub fn requeue(&self, op: QueuedOperation) {
        self.push(op);
    }

    fn push(&self, op: QueuedOperation) {
        let mut inner = self.inner.lock().unwrap();
        if let Err(e) = inner.store.append(&op) {
            tracing::warn!(kind = %op.kind, error = %e, "dropping queued operation, append failed");
            return;
        }
        tracing::debug!(kind = %op.kind, priority = op.priority.name(), "queued offline write");
        inner.ops.push(op);
    }

    /// Removes and returns all operations in stored order.
    pub fn drain(&self) -> Vec<QueuedOperation> {
        let mut inner = self.inner.lock().unwrap();
        if let Err(e) = inner.store.clear() {
            tracing::warn!(error = %e, "could not clear queue file");
        }
        std::mem::take(&mut inner.ops)
    }

    /// Returns a copy of all operations, in stored order, without removal.
    pub fn peek(&self) -> Vec<QueuedOperation> {
        self.inner.lock().unwrap().ops.clone()
    }

    /// Number of pending operations.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().ops.len()
    }

    /// Whether the queue holds no pending operations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("pending", &self.len())
            .finish()
    }
}
