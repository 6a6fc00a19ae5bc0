//! Recipes, the main shareable library.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use super::{Ingredient, Nutrient};
use crate::record::{EntityKind, Record, Shareable};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: String,
    pub nutrients: Vec<Nutrient>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    /// User ids, beyond the owner, permitted to see this recipe.
    pub shared_with: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            name: name.into(),
            ingredients: Vec::new(),
            instructions: String::new(),
            nutrients: Vec::new(),
            tags: Vec::new(),
            image_url: None,
            shared_with: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_ingredients(mut self, ingredients: Vec<Ingredient>) -> Self {
        self.ingredients = ingredients;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_nutrients(mut self, nutrients: Vec<Nutrient>) -> Self {
        self.nutrients = nutrients;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

impl Record for Recipe {
    fn kind() -> EntityKind {
        EntityKind::Recipe
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

    /// Recipes sort alphabetically, not by recency.
    fn cmp_records(a: &Self, b: &Self) -> Ordering {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl Shareable for Recipe {
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

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        if !self.tags.is_empty() {
            writeln!(f, "Tags: {}", self.tags.join(", "))?;
        }
        if !self.ingredients.is_empty() {
            writeln!(f, "Ingredients:")?;
            for ingredient in &self.ingredients {
                writeln!(f, "  - {}", ingredient)?;
            }
        }
        Ok(())
    }
}
