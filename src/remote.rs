//! Remote data store seam.
//!
//! The sync core never talks to a concrete backend; it drives this trait.
//! The production adapter wraps the hosted document store, tests plug in an
//! in-memory double. Subscriptions deliver the full current result set on
//! every change - the core treats each push as authoritative and replaces
//! its slice of state wholesale.

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::record::Record;

/// Document-style CRUD plus subscriptions for one entity type.
///
/// `add` writes the record under its client-generated id, replacing any
/// existing copy (set semantics). That makes queued saves safe to replay
/// without knowing whether the original write ever reached the store.
#[async_trait]
pub trait RemoteStore<T: Record>: Send + Sync {
    /// Upserts a record under its client-generated id.
    async fn add(&self, record: &T) -> Result<()>;

    /// Updates an existing record. Fails with [`CoreError::NotFound`] if the
    /// record has never been written.
    async fn update(&self, record: &T) -> Result<()>;

    /// Deletes by id. Deleting a missing record is not an error.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Fetches one record by id.
    async fn get(&self, id: Uuid) -> Result<Option<T>>;

    /// Returns every record owned by `owner_id`.
    async fn query_by_owner(&self, owner_id: &str) -> Result<Vec<T>>;

    /// Returns every record whose serialized `field` equals `value`.
    async fn query(&self, field: &str, value: &str) -> Result<Vec<T>>;

    /// Subscribes to the records owned by `owner_id`. Every push carries the
    /// full current result set.
    fn subscribe_owned(&self, owner_id: &str) -> watch::Receiver<Vec<T>>;

    /// Subscribes to the records shared with `user_id` (visibility-set
    /// membership, excluding records they own).
    fn subscribe_shared(&self, user_id: &str) -> watch::Receiver<Vec<T>>;

    /// Field-level set add: puts `user_id` into the record's visibility set
    /// without rewriting the whole document.
    async fn add_visibility(&self, _id: Uuid, _user_id: &str) -> Result<()> {
        Err(CoreError::RemoteRejected(format!(
            "collection {} has no visibility set",
            T::kind()
        )))
    }

    /// Field-level set remove, inverse of [`RemoteStore::add_visibility`].
    async fn remove_visibility(&self, _id: Uuid, _user_id: &str) -> Result<()> {
        Err(CoreError::RemoteRejected(format!(
            "collection {} has no visibility set",
            T::kind()
        )))
    }
}
