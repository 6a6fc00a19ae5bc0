//! Sharing invitations: pending until the invitee enters the short code.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::queue::Priority;
use crate::record::{EntityKind, Record};

/// Alphabet for human-entered codes. Ambiguous characters (I, L, O, 0, 1)
/// are left out.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvitationStatus::Pending => write!(f, "pending"),
            InvitationStatus::Accepted => write!(f, "accepted"),
            InvitationStatus::Declined => write!(f, "declined"),
        }
    }
}

/// An offer to share one child profile, redeemed by code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invitation {
    pub id: Uuid,
    pub owner_id: String,
    pub profile_id: Uuid,
    /// Short code the invitee types in.
    pub code: String,
    pub status: InvitationStatus,
    pub accepted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Invitation {
    pub fn new(profile_id: Uuid, owner_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            profile_id,
            code: generate_code(),
            status: InvitationStatus::Pending,
            accepted_by: None,
            created_at: Utc::now(),
            responded_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    /// Transitions pending -> accepted.
    pub fn accept(&mut self, user_id: impl Into<String>) {
        self.status = InvitationStatus::Accepted;
        self.accepted_by = Some(user_id.into());
        self.responded_at = Some(Utc::now());
    }

    /// Transitions pending -> declined.
    pub fn decline(&mut self) {
        self.status = InvitationStatus::Declined;
        self.responded_at = Some(Utc::now());
    }

    /// Case-insensitive code match.
    pub fn matches_code(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }
}

impl Record for Invitation {
    fn kind() -> EntityKind {
        EntityKind::Invitation
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
        Priority::High
    }

    fn cmp_records(a: &Self, b: &Self) -> Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for Invitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invitation {} ({})", self.code, self.status)
    }
}

/// Generates a short human-enterable code.
fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
