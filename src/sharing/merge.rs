//! Merge layer for shareable entity types.
//!
//! Two independent subscriptions feed two source sets, `owned` and
//! `shared_with_me`, each replaced wholesale on every push. Every push
//! triggers a full recomputation of the merged view - correctness over
//! micro-efficiency. An item the owner stops sharing simply vanishes from
//! the shared set's next push, so no tombstones are needed.

use std::collections::HashSet;

use tokio::sync::watch;
use uuid::Uuid;

use crate::record::Shareable;

/// Deduplicated union of the two source sets, in canonical order.
///
/// An id present in both sets yields exactly one entry, with the owned
/// copy's field values winning.
pub fn merge_sources<T: Shareable>(owned: &[T], shared_with_me: &[T]) -> Vec<T> {
    let owned_ids: HashSet<Uuid> = owned.iter().map(|r| r.id()).collect();

    let mut merged: Vec<T> = owned.to_vec();
    merged.extend(
        shared_with_me
            .iter()
            .filter(|r| !owned_ids.contains(&r.id()))
            .cloned(),
    );
    merged.sort_by(T::cmp_records);
    merged
}

/// Holds the two source sets for one entity type and keeps the merged view
/// current.
#[derive(Debug, Clone)]
pub struct MergedCollection<T: Shareable> {
    owned: Vec<T>,
    shared_with_me: Vec<T>,
    merged: Vec<T>,
}

impl<T: Shareable> MergedCollection<T> {
    pub fn new() -> Self {
        Self {
            owned: Vec::new(),
            shared_with_me: Vec::new(),
            merged: Vec::new(),
        }
    }

    /// Replaces the owned set wholesale and recomputes.
    pub fn set_owned(&mut self, owned: Vec<T>) {
        self.owned = owned;
        self.recompute();
    }

    /// Replaces the shared-with-me set wholesale and recomputes.
    pub fn set_shared(&mut self, shared_with_me: Vec<T>) {
        self.shared_with_me = shared_with_me;
        self.recompute();
    }

    /// The merged view, deduplicated and in canonical order.
    pub fn items(&self) -> &[T] {
        &self.merged
    }

    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    fn recompute(&mut self) {
        self.merged = merge_sources(&self.owned, &self.shared_with_me);
    }
}

impl<T: Shareable> Default for MergedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns a task that folds the owned and shared-with-me subscriptions into
/// one merged stream. The task ends when either source closes.
pub fn spawn_merge<T: Shareable>(
    mut owned_rx: watch::Receiver<Vec<T>>,
    mut shared_rx: watch::Receiver<Vec<T>>,
) -> (watch::Receiver<Vec<T>>, tokio::task::JoinHandle<()>) {
    let mut collection = MergedCollection::new();
    collection.set_owned(owned_rx.borrow_and_update().clone());
    collection.set_shared(shared_rx.borrow_and_update().clone());

    let (tx, rx) = watch::channel(collection.items().to_vec());
    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = owned_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    collection.set_owned(owned_rx.borrow_and_update().clone());
                }
                changed = shared_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    collection.set_shared(shared_rx.borrow_and_update().clone());
                }
            }
            if tx.send(collection.items().to_vec()).is_err() {
                break;
            }
        }
    });
    (rx, handle)
}
