//! Planned meals, referencing recipes by id.
//!
//! Entries reference recipes rather than embedding them, so a recipe edit
//! shows up in every plan that uses it. Name resolution happens at display
//! time through an injected lookup (see `manager::MealPlanSummaries`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use super::meal_type::MealType;
use crate::record::{EntityKind, Record, Shareable};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealPlanEntry {
    pub id: Uuid,
    pub owner_id: String,
    /// The child this plan is for, when planned per child.
    pub child_id: Option<Uuid>,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub recipe_ids: Vec<Uuid>,
    /// User ids, beyond the owner, permitted to see this entry.
    pub shared_with: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MealPlanEntry {
    pub fn new(date: NaiveDate, meal_type: MealType, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            child_id: None,
            date,
            meal_type,
            recipe_ids: Vec::new(),
            shared_with: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_child(mut self, child_id: Uuid) -> Self {
        self.child_id = Some(child_id);
        self
    }

    pub fn with_recipe_ids(mut self, recipe_ids: Vec<Uuid>) -> Self {
        self.recipe_ids = recipe_ids;
        self
    }

    pub fn add_recipe(&mut self, recipe_id: Uuid) {
        if !self.recipe_ids.contains(&recipe_id) {
            self.recipe_ids.push(recipe_id);
            self.updated_at = Utc::now();
        }
    }

    pub fn remove_recipe(&mut self, recipe_id: &Uuid) -> bool {
        let before = self.recipe_ids.len();
        self.recipe_ids.retain(|id| id != recipe_id);
        if self.recipe_ids.len() != before {
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }
}

impl Record for MealPlanEntry {
    fn kind() -> EntityKind {
        EntityKind::MealPlan
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
        self.child_id
    }

    /// Chronological: date, then slot within the day.
    fn cmp_records(a: &Self, b: &Self) -> Ordering {
        a.date
            .cmp(&b.date)
            .then_with(|| a.meal_type.slot().cmp(&b.meal_type.slot()))
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl Shareable for MealPlanEntry {
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

impl fmt::Display for MealPlanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} recipe(s))",
            self.date,
            self.meal_type,
            self.recipe_ids.len()
        )
    }
}
