//! Child profiles, the shareable subject every log hangs off.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::queue::Priority;
use crate::record::{EntityKind, Record, Shareable};

/// A child profile. Sharing a profile with another caregiver is what grants
/// them visibility into the child's logs and the owner's libraries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChildProfile {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub birthdate: Option<NaiveDate>,
    /// User ids, beyond the owner, permitted to see this profile.
    pub shared_with: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChildProfile {
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            name: name.into(),
            birthdate: None,
            shared_with: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_birthdate(mut self, birthdate: NaiveDate) -> Self {
        self.birthdate = Some(birthdate);
        self
    }

    /// Age in whole months at `on`, if a birthdate is set.
    pub fn age_months(&self, on: NaiveDate) -> Option<i32> {
        use chrono::Datelike;

        let birth = self.birthdate?;
        if on < birth {
            return Some(0);
        }
        let mut months =
            (on.year() - birth.year()) * 12 + on.month() as i32 - birth.month() as i32;
        if on.day() < birth.day() {
            months -= 1;
        }
        Some(months.max(0))
    }
}

impl Record for ChildProfile {
    fn kind() -> EntityKind {
        EntityKind::Profile
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
        a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
    }
}

impl Shareable for ChildProfile {
    fn shared_with(&self) -> &[String] {
        &self.shared_with
    }

    fn share_with(&mut self, user_id: &str) {
        if !self.shared_with.iter().any(|u| u == user_id) {
            self.shared_with.push(user_id.to_string());
            self.updated_at = Utc::now();
        }
    }

    fn unshare(&mut self, user_id: &str) {
        let before = self.shared_with.len();
        self.shared_with.retain(|u| u != user_id);
        if self.shared_with.len() != before {
            self.updated_at = Utc::now();
        }
    }
}

impl fmt::Display for ChildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(birthdate) = self.birthdate {
            write!(f, " (born {})", birthdate)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_new() {
        let profile = ChildProfile::new("Mara", "user1");
        assert_eq!(profile.name, "Mara");
        assert_eq!(profile.owner_id, "user1");
        assert!(profile.shared_with.is_empty());
        assert!(!profile.id.is_nil());
    }

    #[test]
    fn test_share_with_is_idempotent() {
        let mut profile = ChildProfile::new("Mara", "user1");
        profile.share_with("user2");
        profile.share_with("user2");
        assert_eq!(profile.shared_with, vec!["user2"]);
    }

    #[test]
    fn test_unshare() {
        let mut profile = ChildProfile::new("Mara", "user1");
        profile.share_with("user2");
        profile.unshare("user2");
        assert!(profile.shared_with.is_empty());
    }

    #[test]
    fn test_visibility() {
        let mut profile = ChildProfile::new("Mara", "user1");
        profile.share_with("user2");
        assert!(profile.is_visible_to("user1"));
        assert!(profile.is_visible_to("user2"));
        assert!(!profile.is_visible_to("user3"));
    }

    #[test]
    fn test_age_months() {
        let profile = ChildProfile::new("Mara", "user1")
            .with_birthdate(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());

        let on = NaiveDate::from_ymd_opt(2025, 7, 20).unwrap();
        assert_eq!(profile.age_months(on), Some(6));

        let on = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
        assert_eq!(profile.age_months(on), Some(11));
    }
}
