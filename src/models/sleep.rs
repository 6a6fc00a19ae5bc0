//! Sleep logs, either completed or still ongoing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::record::{EntityKind, Record};

/// One sleep session. `ended_at` is `None` while the child is still asleep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SleepLog {
    pub id: Uuid,
    pub owner_id: String,
    pub child_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SleepLog {
    pub fn new(child_id: Uuid, started_at: DateTime<Utc>, owner_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            child_id,
            started_at,
            ended_at: None,
            location: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_ended_at(mut self, ended_at: DateTime<Utc>) -> Self {
        self.ended_at = Some(ended_at);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_ongoing(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Duration in minutes, once the session has ended.
    pub fn duration_minutes(&self) -> Option<i64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_minutes())
    }
}

impl Record for SleepLog {
    fn kind() -> EntityKind {
        EntityKind::Sleep
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

    /// Most recent sleep first.
    fn cmp_records(a: &Self, b: &Self) -> Ordering {
        b.started_at
            .cmp(&a.started_at)
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for SleepLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.duration_minutes() {
            Some(minutes) => write!(f, "slept {} min", minutes),
            None => write!(f, "sleeping since {}", self.started_at.format("%H:%M")),
        }
    }
}
