//! Medication logs. Safety-relevant, so deferred writes are queued at
//! critical priority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::queue::Priority;
use crate::record::{EntityKind, Record};

/// One administered dose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationLog {
    pub id: Uuid,
    pub owner_id: String,
    pub child_id: Uuid,
    pub given_at: DateTime<Utc>,
    pub medication: String,
    /// Free-form dose, e.g. "2.5 ml" or "1 tablet".
    pub dose: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MedicationLog {
    pub fn new(
        child_id: Uuid,
        medication: impl Into<String>,
        dose: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            child_id,
            given_at: now,
            medication: medication.into(),
            dose: dose.into(),
            notes: None,
            created_at: now,
        }
    }

    pub fn with_given_at(mut self, given_at: DateTime<Utc>) -> Self {
        self.given_at = given_at;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl Record for MedicationLog {
    fn kind() -> EntityKind {
        EntityKind::Medication
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

    fn subject_id(&self) -> Option<Uuid> {
        Some(self.child_id)
    }

    fn save_priority() -> Priority {
        Priority::Critical
    }

    fn cmp_records(a: &Self, b: &Self) -> Ordering {
        b.given_at.cmp(&a.given_at).then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for MedicationLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} at {}",
            self.medication,
            self.dose,
            self.given_at.format("%H:%M")
        )
    }
}
