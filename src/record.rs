//! Record traits shared by every entity type the sync core manages.
//!
//! Identity is client-generated: constructors assign a v4 UUID before the
//! remote store ever sees the record. That is what makes optimistic insert
//! followed by rollback race-free - the id never changes once assigned.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::queue::Priority;

/// The bounded contexts the core tracks, one remote collection each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Profile,
    Feeding,
    Sleep,
    Medication,
    FoodTry,
    Recipe,
    MealPlan,
    Shopping,
    Invitation,
}

impl EntityKind {
    /// Remote collection name for this entity type.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Profile => "profiles",
            EntityKind::Feeding => "feeding_logs",
            EntityKind::Sleep => "sleep_logs",
            EntityKind::Medication => "medication_logs",
            EntityKind::FoodTry => "food_tries",
            EntityKind::Recipe => "recipes",
            EntityKind::MealPlan => "meal_plans",
            EntityKind::Shopping => "shopping_items",
            EntityKind::Invitation => "invitations",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profiles" => Ok(EntityKind::Profile),
            "feeding_logs" => Ok(EntityKind::Feeding),
            "sleep_logs" => Ok(EntityKind::Sleep),
            "medication_logs" => Ok(EntityKind::Medication),
            "food_tries" => Ok(EntityKind::FoodTry),
            "recipes" => Ok(EntityKind::Recipe),
            "meal_plans" => Ok(EntityKind::MealPlan),
            "shopping_items" => Ok(EntityKind::Shopping),
            "invitations" => Ok(EntityKind::Invitation),
            _ => Err(format!("Unknown entity kind '{}'", s)),
        }
    }
}

/// A record the sync core can manage: client-generated identity, an owner,
/// an optional subject (which child it belongs to), and a canonical
/// per-collection sort order.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Entity kind, used for queue tagging and replay dispatch.
    fn kind() -> EntityKind;

    /// Client-generated identity. Never changes once assigned.
    fn id(&self) -> Uuid;

    /// Backfills the identity. Only called when `id()` is nil.
    fn set_id(&mut self, id: Uuid);

    /// The user who owns this record.
    fn owner_id(&self) -> &str;

    /// The child profile this record belongs to, where applicable.
    fn subject_id(&self) -> Option<Uuid> {
        None
    }

    /// Queue priority for writes deferred while disconnected.
    fn save_priority() -> Priority {
        Priority::Normal
    }

    /// Canonical comparator for the in-memory collection. Most collections
    /// sort most-recent-first.
    fn cmp_records(a: &Self, b: &Self) -> Ordering;
}

/// A record that participates in the sharing layer: it carries a visibility
/// set of user ids, beyond the owner, permitted to see it.
pub trait Shareable: Record {
    /// Users granted visibility, not including the owner.
    fn shared_with(&self) -> &[String];

    /// Adds a user to the visibility set. Idempotent.
    fn share_with(&mut self, user_id: &str);

    /// Removes a user from the visibility set.
    fn unshare(&mut self, user_id: &str);

    /// Whether the given user may see this record.
    fn is_visible_to(&self, user_id: &str) -> bool {
        self.owner_id() == user_id || self.shared_with().iter().any(|u| u == user_id)
    }
}
