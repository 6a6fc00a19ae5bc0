//! Shopping list items. List bookkeeping, so deferred writes queue at low
//! priority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::queue::Priority;
use crate::record::{EntityKind, Record};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShoppingItem {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    /// Free-form quantity, e.g. "2" or "a few".
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub checked: bool,
    pub added_at: DateTime<Utc>,
}

impl ShoppingItem {
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            name: name.into(),
            quantity: None,
            unit: None,
            checked: false,
            added_at: Utc::now(),
        }
    }

    pub fn with_quantity(mut self, quantity: impl Into<String>, unit: impl Into<String>) -> Self {
        let quantity = quantity.into();
        let unit = unit.into();
        self.quantity = (!quantity.is_empty()).then_some(quantity);
        self.unit = (!unit.is_empty()).then_some(unit);
        self
    }

    pub fn check(&mut self) {
        self.checked = true;
    }

    pub fn uncheck(&mut self) {
        self.checked = false;
    }
}

impl Record for ShoppingItem {
    fn kind() -> EntityKind {
        EntityKind::Shopping
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn save_priority() -> Priority {
        Priority::Low
    }

    /// Unchecked items first, alphabetical within each group.
    fn cmp_records(a: &Self, b: &Self) -> Ordering {
        a.checked
            .cmp(&b.checked)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for ShoppingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.checked { "x" } else { " " };
        write!(f, "[{}] ", mark)?;
        match (&self.quantity, &self.unit) {
            (Some(qty), Some(unit)) => write!(f, "{} {} {}", qty, unit, self.name),
            (Some(qty), None) => write!(f, "{} {}", qty, self.name),
            _ => write!(f, "{}", self.name),
        }
    }
}
