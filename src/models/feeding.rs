//! Feeding logs: bottles, nursing sessions, and solids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::queue::Priority;
use crate::record::{EntityKind, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedingKind {
    Bottle,
    Nursing,
    Solid,
}

impl fmt::Display for FeedingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedingKind::Bottle => write!(f, "bottle"),
            FeedingKind::Nursing => write!(f, "nursing"),
            FeedingKind::Solid => write!(f, "solid"),
        }
    }
}

impl FromStr for FeedingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bottle" => Ok(FeedingKind::Bottle),
            "nursing" => Ok(FeedingKind::Nursing),
            "solid" => Ok(FeedingKind::Solid),
            _ => Err(format!(
                "Invalid feeding kind '{}'. Valid options: bottle, nursing, solid",
                s
            )),
        }
    }
}

/// One feeding event for a child.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedingLog {
    pub id: Uuid,
    pub owner_id: String,
    pub child_id: Uuid,
    pub fed_at: DateTime<Utc>,
    pub kind: FeedingKind,
    /// Amount in milliliters, for bottles.
    pub amount_ml: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeedingLog {
    pub fn new(child_id: Uuid, kind: FeedingKind, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            child_id,
            fed_at: now,
            kind,
            amount_ml: None,
            notes: None,
            created_at: now,
        }
    }

    pub fn with_fed_at(mut self, fed_at: DateTime<Utc>) -> Self {
        self.fed_at = fed_at;
        self
    }

    pub fn with_amount_ml(mut self, amount_ml: f64) -> Self {
        self.amount_ml = Some(amount_ml);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl Record for FeedingLog {
    fn kind() -> EntityKind {
        EntityKind::Feeding
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
        Priority::High
    }

    /// Most recent feeding first.
    fn cmp_records(a: &Self, b: &Self) -> Ordering {
        b.fed_at.cmp(&a.fed_at).then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for FeedingLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.fed_at.format("%H:%M"))?;
        if let Some(ml) = self.amount_ml {
            write!(f, " ({} ml)", ml)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feeding_kind_from_str() {
        assert_eq!(FeedingKind::from_str("Bottle").unwrap(), FeedingKind::Bottle);
        assert_eq!(FeedingKind::from_str("nursing").unwrap(), FeedingKind::Nursing);
        assert!(FeedingKind::from_str("juice").is_err());
    }

    #[test]
    fn test_feeding_log_new() {
        let child = Uuid::new_v4();
        let log = FeedingLog::new(child, FeedingKind::Bottle, "user1").with_amount_ml(120.0);

        assert_eq!(log.child_id, child);
        assert_eq!(log.amount_ml, Some(120.0));
        assert_eq!(log.owner_id, "user1");
    }

    #[test]
    fn test_comparator_most_recent_first() {
        let child = Uuid::new_v4();
        let older = FeedingLog::new(child, FeedingKind::Bottle, "u")
            .with_fed_at(Utc::now() - chrono::Duration::hours(3));
        let newer = FeedingLog::new(child, FeedingKind::Solid, "u");

        assert_eq!(FeedingLog::cmp_records(&newer, &older), Ordering::Less);
    }

    #[test]
    fn test_json_roundtrip() {
        let log = FeedingLog::new(Uuid::new_v4(), FeedingKind::Nursing, "user1");
        let json = serde_json::to_string(&log).unwrap();
        let parsed: FeedingLog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, log);
    }
}
