//! Sproutling Core
//!
//! Offline-first synchronization core for the Sproutling child-care
//! tracker: optimistic local mutation with rollback, a durable offline
//! queue replayed on reconnect, retry/timeout-wrapped remote calls, and an
//! owned/shared-with-me merge layer for shared libraries.

pub mod connectivity;
pub mod error;
pub mod exec;
pub mod manager;
pub mod models;
pub mod queue;
pub mod record;
pub mod remote;
pub mod sharing;
pub mod stats;

pub use connectivity::ConnectivityMonitor;
pub use error::{CoreError, Result};
pub use manager::{DomainManager, MealPlanSummaries, NameLookup, PlanSummary};
pub use models::{
    ChildProfile, FeedingKind, FeedingLog, FoodCategory, FoodColor, FoodTry, Ingredient,
    MealPlanEntry, MealType, MedicationLog, Nutrient, Recipe, ShoppingItem, SleepLog,
};
pub use queue::replay::{QueueReplayer, ReplayHandler};
pub use queue::{OfflineQueue, OpAction, OperationKind, Priority, QueuedOperation};
pub use record::{EntityKind, Record, Shareable};
pub use remote::RemoteStore;
pub use sharing::{
    merge_sources, spawn_merge, Invitation, InvitationStatus, LibraryVisibility,
    MergedCollection, RemoteLibrary, SharingService,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
