//! Domain managers: one per bounded context, all sharing the same optimistic
//! write protocol.
//!
//! Every mutation is three-phase: *stage* the local change and remember the
//! prior state, then either *commit* (remote call succeeded, or the write was
//! queued while offline) or *compensate* (replay the remembered prior state
//! and surface the error). The staged mutation itself never suspends; the
//! collection lock is only ever held across synchronous code.
//!
//! A caller that awaits `save` observes exactly one of three outcomes:
//! persisted remotely, queued with no error, or rolled back with the error
//! rethrown.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::connectivity::ConnectivityMonitor;
use crate::error::{CoreError, Result};
use crate::exec::{self, DEFAULT_MAX_ATTEMPTS, SINGLE_DOC_TIMEOUT};
use crate::models::{MealPlanEntry, MealType, Recipe};
use crate::queue::replay::ReplayHandler;
use crate::queue::{OfflineQueue, OpAction, OperationKind, QueuedOperation};
use crate::record::{EntityKind, Record};
use crate::remote::RemoteStore;

/// Generic manager for one entity type's in-memory collection.
pub struct DomainManager<T: Record> {
    user_id: String,
    remote: Arc<dyn RemoteStore<T>>,
    connectivity: ConnectivityMonitor,
    queue: OfflineQueue,
    records: RwLock<Vec<T>>,
    max_attempts: u32,
    call_timeout: Duration,
}

impl<T: Record> DomainManager<T> {
    pub fn new(
        user_id: impl Into<String>,
        remote: Arc<dyn RemoteStore<T>>,
        connectivity: ConnectivityMonitor,
        queue: OfflineQueue,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            remote,
            connectivity,
            queue,
            records: RwLock::new(Vec::new()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            call_timeout: SINGLE_DOC_TIMEOUT,
        }
    }

    /// Overrides the retry/timeout budget, mainly for tests.
    pub fn with_budget(mut self, max_attempts: u32, call_timeout: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.call_timeout = call_timeout;
        self
    }

    /// The signed-in user this manager works on behalf of.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    // ==================== reads ====================

    /// Snapshot of the collection in canonical order.
    pub fn all(&self) -> Vec<T> {
        self.records.read().unwrap().clone()
    }

    pub fn get(&self, id: Uuid) -> Option<T> {
        self.records
            .read()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Records belonging to one child, in canonical order.
    pub fn for_subject(&self, child_id: Uuid) -> Vec<T> {
        self.records
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.subject_id() == Some(child_id))
            .cloned()
            .collect()
    }

    // ==================== writes ====================

    /// Saves a record: optimistic upsert, then remote confirmation, offline
    /// queueing, or rollback.
    pub async fn save(&self, mut record: T) -> Result<T> {
        if record.id().is_nil() {
            record.set_id(Uuid::new_v4());
        }

        let prior = self.stage_upsert(record.clone());

        if !self.connectivity.is_connected() {
            self.queue
                .enqueue(OperationKind::save(T::kind()), T::save_priority(), &record);
            tracing::debug!(collection = %T::kind(), id = %record.id(), "offline, save queued");
            return Ok(record);
        }

        match self.push_remote(&record).await {
            Ok(()) => Ok(record),
            Err(e) => {
                self.unstage(record.id(), prior);
                tracing::warn!(
                    collection = %T::kind(),
                    id = %record.id(),
                    error = %e,
                    "save failed, rolled back"
                );
                Err(e)
            }
        }
    }

    /// Updates an existing record. Fails with [`CoreError::NotFound`] if the
    /// record is not in the collection; otherwise behaves like [`save`],
    /// restoring the prior value on rollback.
    ///
    /// [`save`]: DomainManager::save
    pub async fn update(&self, record: T) -> Result<T> {
        if self.get(record.id()).is_none() {
            return Err(CoreError::NotFound(format!(
                "{} {}",
                T::kind(),
                record.id()
            )));
        }
        self.save(record).await
    }

    /// Deletes a record: optimistic remove, then remote confirmation, offline
    /// queueing, or reinsert on failure.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let removed = {
            let mut records = self.records.write().unwrap();
            match records.iter().position(|r| r.id() == id) {
                Some(idx) => records.remove(idx),
                None => return Err(CoreError::NotFound(format!("{} {}", T::kind(), id))),
            }
        };

        if !self.connectivity.is_connected() {
            self.queue
                .enqueue(OperationKind::delete(T::kind()), T::save_priority(), &id);
            tracing::debug!(collection = %T::kind(), %id, "offline, delete queued");
            return Ok(());
        }

        let timeout = self.call_timeout;
        let result = exec::with_retry(self.max_attempts, || {
            let remote = Arc::clone(&self.remote);
            async move { exec::with_timeout(timeout, remote.delete(id)).await }
        })
        .await;

        if let Err(e) = result {
            self.unstage(id, Some(removed));
            tracing::warn!(collection = %T::kind(), %id, error = %e, "delete failed, reinserted");
            return Err(e);
        }
        Ok(())
    }

    // ==================== subscription boundary ====================

    /// Applies an authoritative push from the remote subscription: the whole
    /// slice of state is replaced and re-sorted (last-write-wins).
    pub fn apply_remote(&self, records: Vec<T>) {
        let mut records = records;
        records.sort_by(T::cmp_records);
        *self.records.write().unwrap() = records;
    }

    /// Spawns a task that folds the owned-records subscription into the
    /// collection. For shareable types the merge layer drives `apply_remote`
    /// instead.
    pub fn attach_owned_subscription(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut rx = self.remote.subscribe_owned(&self.user_id);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                manager.apply_remote(snapshot);
            }
        })
    }

    // ==================== internals ====================

    /// Stage phase: insert or replace, returning the prior copy for a
    /// possible compensation. Never suspends.
    fn stage_upsert(&self, record: T) -> Option<T> {
        let mut records = self.records.write().unwrap();
        let prior = match records.iter().position(|r| r.id() == record.id()) {
            Some(idx) => Some(std::mem::replace(&mut records[idx], record)),
            None => {
                records.push(record);
                None
            }
        };
        records.sort_by(T::cmp_records);
        prior
    }

    /// Compensate phase: replay the remembered prior state.
    fn unstage(&self, id: Uuid, prior: Option<T>) {
        let mut records = self.records.write().unwrap();
        match prior {
            Some(prior) => match records.iter().position(|r| r.id() == id) {
                Some(idx) => records[idx] = prior,
                None => records.push(prior),
            },
            None => records.retain(|r| r.id() != id),
        }
        records.sort_by(T::cmp_records);
    }

    /// Remote write wrapped in the standard retry/timeout composition.
    ///
    /// Always `add`: its set semantics under the client id make the first
    /// write, a re-save of a record the remote has never seen (saved while
    /// offline, still queued), and a queue replay one and the same path.
    async fn push_remote(&self, record: &T) -> Result<()> {
        let timeout = self.call_timeout;
        exec::with_retry(self.max_attempts, || {
            let record = record.clone();
            let remote = Arc::clone(&self.remote);
            async move { exec::with_timeout(timeout, remote.add(&record)).await }
        })
        .await
    }
}

#[async_trait]
impl<T: Record> ReplayHandler for DomainManager<T> {
    fn entity(&self) -> EntityKind {
        T::kind()
    }

    async fn replay(&self, op: &QueuedOperation) -> Result<()> {
        if !self.connectivity.is_connected() {
            return Err(CoreError::NetworkUnavailable);
        }
        match op.kind.action {
            OpAction::Save => {
                let record: T = serde_json::from_value(op.payload.clone())?;
                // the record is already in memory from the optimistic insert;
                // only the remote write is outstanding
                self.push_remote(&record).await
            }
            OpAction::Delete => {
                let id: Uuid = serde_json::from_value(op.payload.clone())?;
                let timeout = self.call_timeout;
                exec::with_retry(self.max_attempts, || {
                    let remote = Arc::clone(&self.remote);
                    async move { exec::with_timeout(timeout, remote.delete(id)).await }
                })
                .await
            }
        }
    }
}

// ==================== cross-manager lookups ====================

/// Narrow read-only capability injected where one manager needs another's
/// catalog, instead of a back-pointer between managers.
pub type NameLookup = Arc<dyn Fn(Uuid) -> Option<String> + Send + Sync>;

impl DomainManager<Recipe> {
    /// A name-resolution capability over this manager's current collection.
    pub fn name_lookup(self: &Arc<Self>) -> NameLookup {
        let recipes = Arc::clone(self);
        Arc::new(move |id| recipes.get(id).map(|r| r.name))
    }
}

/// Display-ready meal plan rows with recipe names resolved through an
/// injected lookup.
pub struct MealPlanSummaries {
    plans: Arc<DomainManager<MealPlanEntry>>,
    recipe_name: NameLookup,
}

/// One resolved meal plan row.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSummary {
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub recipe_names: Vec<String>,
}

impl MealPlanSummaries {
    pub fn new(plans: Arc<DomainManager<MealPlanEntry>>, recipe_name: NameLookup) -> Self {
        Self { plans, recipe_name }
    }

    /// Resolved entries for one date, in slot order.
    pub fn for_date(&self, date: NaiveDate) -> Vec<PlanSummary> {
        self.plans
            .all()
            .into_iter()
            .filter(|entry| entry.date == date)
            .map(|entry| PlanSummary {
                date: entry.date,
                meal_type: entry.meal_type,
                recipe_names: entry
                    .recipe_ids
                    .iter()
                    .map(|id| {
                        (self.recipe_name)(*id).unwrap_or_else(|| "(unknown recipe)".to_string())
                    })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedingKind, FeedingLog};
    use crate::queue::Priority;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::sync::watch;

    /// Remote double that accepts everything and stores nothing.
    #[derive(Default)]
    struct NullRemote;

    #[async_trait]
    impl<T: Record> RemoteStore<T> for NullRemote {
        async fn add(&self, _record: &T) -> Result<()> {
            Ok(())
        }

        async fn update(&self, _record: &T) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _id: Uuid) -> Result<()> {
            Ok(())
        }

        async fn get(&self, _id: Uuid) -> Result<Option<T>> {
            Ok(None)
        }

        async fn query_by_owner(&self, _owner_id: &str) -> Result<Vec<T>> {
            Ok(Vec::new())
        }

        async fn query(&self, _field: &str, _value: &str) -> Result<Vec<T>> {
            Ok(Vec::new())
        }

        fn subscribe_owned(&self, _owner_id: &str) -> watch::Receiver<Vec<T>> {
            watch::channel(Vec::new()).1
        }

        fn subscribe_shared(&self, _user_id: &str) -> watch::Receiver<Vec<T>> {
            watch::channel(Vec::new()).1
        }
    }

    /// Minimal remote double: upsert-by-id vec, optional failure switch.
    struct FakeRemote {
        records: RwLock<Vec<FeedingLog>>,
        fail_writes: AtomicBool,
        write_calls: AtomicUsize,
    }

    impl FakeRemote {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                records: RwLock::new(Vec::new()),
                fail_writes: AtomicBool::new(false),
                write_calls: AtomicUsize::new(0),
            })
        }

        fn check_failure(&self) -> Result<()> {
            self.write_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(CoreError::RemoteOperationFailed("injected".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RemoteStore<FeedingLog> for FakeRemote {
        async fn add(&self, record: &FeedingLog) -> Result<()> {
            self.check_failure()?;
            let mut records = self.records.write().unwrap();
            records.retain(|r| r.id != record.id);
            records.push(record.clone());
            Ok(())
        }

        async fn update(&self, record: &FeedingLog) -> Result<()> {
            self.add(record).await
        }

        async fn delete(&self, id: Uuid) -> Result<()> {
            self.check_failure()?;
            self.records.write().unwrap().retain(|r| r.id != id);
            Ok(())
        }

        async fn get(&self, id: Uuid) -> Result<Option<FeedingLog>> {
            Ok(self
                .records
                .read()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned())
        }

        async fn query_by_owner(&self, owner_id: &str) -> Result<Vec<FeedingLog>> {
            Ok(self
                .records
                .read()
                .unwrap()
                .iter()
                .filter(|r| r.owner_id == owner_id)
                .cloned()
                .collect())
        }

        async fn query(&self, _field: &str, _value: &str) -> Result<Vec<FeedingLog>> {
            Ok(Vec::new())
        }

        fn subscribe_owned(&self, _owner_id: &str) -> watch::Receiver<Vec<FeedingLog>> {
            watch::channel(Vec::new()).1
        }

        fn subscribe_shared(&self, _user_id: &str) -> watch::Receiver<Vec<FeedingLog>> {
            watch::channel(Vec::new()).1
        }
    }

    struct Fixture {
        manager: DomainManager<FeedingLog>,
        remote: Arc<FakeRemote>,
        queue: OfflineQueue,
        connectivity: ConnectivityMonitor,
        _temp: TempDir,
    }

    fn fixture(connected: bool) -> Fixture {
        let temp = TempDir::new().unwrap();
        let queue = OfflineQueue::open(temp.path().to_path_buf());
        let connectivity = ConnectivityMonitor::new(connected);
        let remote = FakeRemote::new();
        let manager = DomainManager::new(
            "user1",
            remote.clone() as Arc<dyn RemoteStore<FeedingLog>>,
            connectivity.clone(),
            queue.clone(),
        )
        .with_budget(3, Duration::from_millis(200));
        Fixture {
            manager,
            remote,
            queue,
            connectivity,
            _temp: temp,
        }
    }

    fn log() -> FeedingLog {
        FeedingLog::new(Uuid::new_v4(), FeedingKind::Bottle, "user1").with_amount_ml(120.0)
    }

    #[tokio::test]
    async fn test_online_save_confirms_remotely() {
        let fx = fixture(true);
        let saved = fx.manager.save(log()).await.unwrap();

        assert_eq!(fx.manager.count(), 1);
        assert!(fx.queue.is_empty());
        assert!(fx.remote.get(saved.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_offline_save_queues_without_error() {
        let fx = fixture(false);
        fx.manager.save(log()).await.unwrap();

        assert_eq!(fx.manager.count(), 1);
        assert_eq!(fx.queue.len(), 1);
        assert_eq!(fx.queue.peek()[0].priority, Priority::High);
        assert_eq!(fx.remote.write_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_edit_after_offline_save_confirms_remotely() {
        // the first save never reached the remote, only the queue; editing
        // after connectivity returns must not depend on remote existence
        let fx = fixture(false);
        let saved = fx.manager.save(log()).await.unwrap();
        assert_eq!(fx.queue.len(), 1);

        fx.connectivity.set_connected(true);
        let mut edited = saved.clone();
        edited.amount_ml = Some(150.0);
        let resaved = fx.manager.save(edited).await.unwrap();

        assert_eq!(resaved.amount_ml, Some(150.0));
        let remote_copy = fx.remote.get(saved.id).await.unwrap().unwrap();
        assert_eq!(remote_copy.amount_ml, Some(150.0));
        assert_eq!(fx.manager.get(saved.id).unwrap().amount_ml, Some(150.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_rolls_back_exactly() {
        let fx = fixture(true);
        let existing = fx.manager.save(log()).await.unwrap();
        let before = fx.manager.all();

        fx.remote.fail_writes.store(true, Ordering::SeqCst);
        let result = fx.manager.save(log()).await;

        assert!(matches!(result, Err(CoreError::RemoteOperationFailed(_))));
        let after = fx.manager.all();
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0].id, existing.id);
        assert!(fx.queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_update_restores_prior_value() {
        let fx = fixture(true);
        let saved = fx.manager.save(log()).await.unwrap();

        fx.remote.fail_writes.store(true, Ordering::SeqCst);
        let mut edited = saved.clone();
        edited.amount_ml = Some(999.0);
        let result = fx.manager.update(edited).await;

        assert!(result.is_err());
        assert_eq!(fx.manager.get(saved.id).unwrap().amount_ml, Some(120.0));
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let fx = fixture(true);
        let result = fx.manager.update(log()).await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_consumed_before_rollback() {
        let fx = fixture(true);
        fx.remote.fail_writes.store(true, Ordering::SeqCst);

        let result = fx.manager.save(log()).await;
        assert!(result.is_err());
        assert_eq!(fx.remote.write_calls.load(Ordering::SeqCst), 3);
        assert_eq!(fx.manager.count(), 0);
    }

    #[tokio::test]
    async fn test_offline_delete_queues_counterpart() {
        let fx = fixture(true);
        let saved = fx.manager.save(log()).await.unwrap();

        fx.connectivity.set_connected(false);
        fx.manager.delete(saved.id).await.unwrap();

        assert_eq!(fx.manager.count(), 0);
        assert_eq!(fx.queue.len(), 1);
        assert_eq!(fx.queue.peek()[0].kind.action, OpAction::Delete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_reinserts() {
        let fx = fixture(true);
        let saved = fx.manager.save(log()).await.unwrap();

        fx.remote.fail_writes.store(true, Ordering::SeqCst);
        let result = fx.manager.delete(saved.id).await;

        assert!(result.is_err());
        assert_eq!(fx.manager.count(), 1);
        assert_eq!(fx.manager.get(saved.id).unwrap(), saved);
    }

    #[tokio::test]
    async fn test_apply_remote_replaces_wholesale() {
        let fx = fixture(true);
        fx.manager.save(log()).await.unwrap();

        let replacement = vec![log(), log(), log()];
        fx.manager.apply_remote(replacement);
        assert_eq!(fx.manager.count(), 3);
    }

    #[tokio::test]
    async fn test_save_backfills_nil_id() {
        let fx = fixture(true);
        let mut record = log();
        record.id = Uuid::nil();

        let saved = fx.manager.save(record).await.unwrap();
        assert!(!saved.id.is_nil());
    }

    #[tokio::test]
    async fn test_plan_summaries_resolve_names() {
        let temp = TempDir::new().unwrap();
        let queue = OfflineQueue::open(temp.path().to_path_buf());
        let connectivity = ConnectivityMonitor::new(true);

        let plans: Arc<DomainManager<MealPlanEntry>> = Arc::new(DomainManager::new(
            "user1",
            Arc::new(NullRemote) as Arc<dyn RemoteStore<MealPlanEntry>>,
            connectivity,
            queue,
        ));

        let recipe = Recipe::new("Oat porridge", "user1");
        let recipe_id = recipe.id;
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        plans.apply_remote(vec![MealPlanEntry::new(date, MealType::Breakfast, "user1")
            .with_recipe_ids(vec![recipe_id, Uuid::new_v4()])]);

        let lookup: NameLookup = Arc::new(move |id| {
            (id == recipe_id).then(|| "Oat porridge".to_string())
        });
        let summaries = MealPlanSummaries::new(plans, lookup);

        let rows = summaries.for_date(date);
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].recipe_names,
            vec!["Oat porridge", "(unknown recipe)"]
        );
    }
}
