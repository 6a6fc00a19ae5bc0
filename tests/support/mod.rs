//! Shared test doubles for the integration tests.
//!
//! Each integration test binary uses a different slice of this module.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once, RwLock};

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use sproutling_core::{CoreError, Record, RemoteStore, Result, Shareable};

static TRACING: Once = Once::new();

/// Installs the log subscriber for the test binary. `RUST_LOG` filters.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Failure injection for remote writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    None,
    /// Fails with a retryable error.
    Transient,
    /// Fails with an error that must not be retried.
    Permanent,
    /// Fails the next `n` writes with a retryable error, then recovers.
    TransientBurst(usize),
}

type VisibilityHook<T> = Box<dyn Fn(&mut T, &str, bool) + Send + Sync>;

/// In-memory stand-in for the remote document store.
///
/// `add` has set semantics (upsert by client id), matching the trait
/// contract. Subscription pushes are driven manually from the tests.
pub struct InMemoryRemote<T: Record> {
    records: RwLock<Vec<T>>,
    failure: Mutex<FailureMode>,
    pub write_calls: AtomicUsize,
    owned_subs: Mutex<HashMap<String, watch::Sender<Vec<T>>>>,
    shared_subs: Mutex<HashMap<String, watch::Sender<Vec<T>>>>,
    visibility: Option<VisibilityHook<T>>,
}

impl<T: Record> InMemoryRemote<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: RwLock::new(Vec::new()),
            failure: Mutex::new(FailureMode::None),
            write_calls: AtomicUsize::new(0),
            owned_subs: Mutex::new(HashMap::new()),
            shared_subs: Mutex::new(HashMap::new()),
            visibility: None,
        })
    }

    pub fn set_failure(&self, mode: FailureMode) {
        *self.failure.lock().unwrap() = mode;
    }

    pub fn stored(&self) -> Vec<T> {
        self.records.read().unwrap().clone()
    }

    pub fn seed(&self, records: Vec<T>) {
        *self.records.write().unwrap() = records;
    }

    /// Simulates the remote pushing a full owned result set.
    pub fn push_owned(&self, owner_id: &str, records: Vec<T>) {
        let _ = Self::sender_for(&self.owned_subs, owner_id).send(records);
    }

    /// Simulates the remote pushing a full shared-with-me result set.
    pub fn push_shared(&self, user_id: &str, records: Vec<T>) {
        let _ = Self::sender_for(&self.shared_subs, user_id).send(records);
    }

    fn sender_for(
        map: &Mutex<HashMap<String, watch::Sender<Vec<T>>>>,
        key: &str,
    ) -> watch::Sender<Vec<T>> {
        map.lock()
            .unwrap()
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(Vec::new()).0)
            .clone()
    }

    fn check_write(&self) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let mut failure = self.failure.lock().unwrap();
        match *failure {
            FailureMode::None => Ok(()),
            FailureMode::Transient => Err(CoreError::RemoteOperationFailed("injected".into())),
            FailureMode::Permanent => Err(CoreError::RemoteRejected("injected".into())),
            FailureMode::TransientBurst(0) => {
                *failure = FailureMode::None;
                Ok(())
            }
            FailureMode::TransientBurst(n) => {
                *failure = FailureMode::TransientBurst(n - 1);
                Err(CoreError::RemoteOperationFailed("injected".into()))
            }
        }
    }
}

impl<T: Shareable> InMemoryRemote<T> {
    /// A store whose records carry a visibility set, so the field-level set
    /// operations work.
    pub fn shareable() -> Arc<Self> {
        Arc::new(Self {
            records: RwLock::new(Vec::new()),
            failure: Mutex::new(FailureMode::None),
            write_calls: AtomicUsize::new(0),
            owned_subs: Mutex::new(HashMap::new()),
            shared_subs: Mutex::new(HashMap::new()),
            visibility: Some(Box::new(|record, user_id, add| {
                if add {
                    record.share_with(user_id);
                } else {
                    record.unshare(user_id);
                }
            })),
        })
    }
}

#[async_trait]
impl<T: Record> RemoteStore<T> for InMemoryRemote<T> {
    async fn add(&self, record: &T) -> Result<()> {
        self.check_write()?;
        let mut records = self.records.write().unwrap();
        records.retain(|r| r.id() != record.id());
        records.push(record.clone());
        Ok(())
    }

    async fn update(&self, record: &T) -> Result<()> {
        self.check_write()?;
        let mut records = self.records.write().unwrap();
        match records.iter().position(|r| r.id() == record.id()) {
            Some(idx) => {
                records[idx] = record.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("record {}", record.id()))),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.check_write()?;
        self.records.write().unwrap().retain(|r| r.id() != id);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<T>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned())
    }

    async fn query_by_owner(&self, owner_id: &str) -> Result<Vec<T>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.owner_id() == owner_id)
            .cloned()
            .collect())
    }

    async fn query(&self, field: &str, value: &str) -> Result<Vec<T>> {
        let records = self.records.read().unwrap();
        let mut matches = Vec::new();
        for record in records.iter() {
            let repr = serde_json::to_value(record)?;
            if repr[field].as_str() == Some(value) {
                matches.push(record.clone());
            }
        }
        Ok(matches)
    }

    fn subscribe_owned(&self, owner_id: &str) -> watch::Receiver<Vec<T>> {
        Self::sender_for(&self.owned_subs, owner_id).subscribe()
    }

    fn subscribe_shared(&self, user_id: &str) -> watch::Receiver<Vec<T>> {
        Self::sender_for(&self.shared_subs, user_id).subscribe()
    }

    async fn add_visibility(&self, id: Uuid, user_id: &str) -> Result<()> {
        self.check_write()?;
        let hook = self
            .visibility
            .as_ref()
            .ok_or_else(|| CoreError::RemoteRejected("no visibility set".into()))?;
        let mut records = self.records.write().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| CoreError::NotFound(format!("record {}", id)))?;
        hook(record, user_id, true);
        Ok(())
    }

    async fn remove_visibility(&self, id: Uuid, user_id: &str) -> Result<()> {
        self.check_write()?;
        let hook = self
            .visibility
            .as_ref()
            .ok_or_else(|| CoreError::RemoteRejected("no visibility set".into()))?;
        let mut records = self.records.write().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| CoreError::NotFound(format!("record {}", id)))?;
        hook(record, user_id, false);
        Ok(())
    }
}
