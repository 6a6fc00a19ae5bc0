//! Queued operation shape and priorities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::EntityKind;

/// Replay priority for deferred writes.
///
/// Priority affects only the order replay traverses the queue; the stored
/// append order is never mutated. Safety-relevant writes (medication logs)
/// are critical, routine logs high or normal, list bookkeeping low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Priority {
    Critical = 0,
    High = 1,
    Normal = 2,
    Low = 3,
}

impl Priority {
    pub fn name(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

/// What a queued operation replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpAction {
    /// Upsert the serialized record.
    Save,
    /// Delete by id.
    Delete,
}

/// Tag identifying which domain action a queued operation replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationKind {
    pub entity: EntityKind,
    pub action: OpAction,
}

impl OperationKind {
    pub fn save(entity: EntityKind) -> Self {
        Self {
            entity,
            action: OpAction::Save,
        }
    }

    pub fn delete(entity: EntityKind) -> Self {
        Self {
            entity,
            action: OpAction::Delete,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = match self.action {
            OpAction::Save => "save",
            OpAction::Delete => "delete",
        };
        write!(f, "{}.{}", self.entity, action)
    }
}

/// A write deferred because connectivity was absent at write time.
///
/// The payload is opaque to the queue: a serialized record for saves, a bare
/// id for deletes. Only the matching domain manager can decode it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub kind: OperationKind,
    pub payload: serde_json::Value,
    pub priority: Priority,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedOperation {
    pub fn new(kind: OperationKind, priority: Priority, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            priority,
            enqueued_at: Utc::now(),
        }
    }
}
