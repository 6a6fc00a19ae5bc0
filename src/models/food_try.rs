//! Food-tried logs: which foods a child has been introduced to, with the
//! color and category data the "eat the rainbow" widgets are built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::record::{EntityKind, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodColor {
    Red,
    Orange,
    Yellow,
    Green,
    Purple,
    White,
    Brown,
}

impl fmt::Display for FoodColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FoodColor::Red => "red",
            FoodColor::Orange => "orange",
            FoodColor::Yellow => "yellow",
            FoodColor::Green => "green",
            FoodColor::Purple => "purple",
            FoodColor::White => "white",
            FoodColor::Brown => "brown",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for FoodColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "red" => Ok(FoodColor::Red),
            "orange" => Ok(FoodColor::Orange),
            "yellow" => Ok(FoodColor::Yellow),
            "green" => Ok(FoodColor::Green),
            "purple" => Ok(FoodColor::Purple),
            "white" => Ok(FoodColor::White),
            "brown" => Ok(FoodColor::Brown),
            _ => Err(format!("Unknown food color '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodCategory {
    Fruit,
    Vegetable,
    Grain,
    Protein,
    Dairy,
    Other,
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FoodCategory::Fruit => "fruit",
            FoodCategory::Vegetable => "vegetable",
            FoodCategory::Grain => "grain",
            FoodCategory::Protein => "protein",
            FoodCategory::Dairy => "dairy",
            FoodCategory::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// A food the child has tried.
///
/// `still_tried` is the mutable status flag: unmarking keeps the history row
/// but removes the food from distributions and progress widgets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodTry {
    pub id: Uuid,
    pub owner_id: String,
    pub child_id: Uuid,
    pub food_name: String,
    pub category: FoodCategory,
    pub color: FoodColor,
    pub tried_at: DateTime<Utc>,
    pub reaction: Option<String>,
    pub still_tried: bool,
    pub created_at: DateTime<Utc>,
}

impl FoodTry {
    pub fn new(
        child_id: Uuid,
        food_name: impl Into<String>,
        category: FoodCategory,
        color: FoodColor,
        owner_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            child_id,
            food_name: food_name.into(),
            category,
            color,
            tried_at: now,
            reaction: None,
            still_tried: true,
            created_at: now,
        }
    }

    pub fn with_reaction(mut self, reaction: impl Into<String>) -> Self {
        self.reaction = Some(reaction.into());
        self
    }

    pub fn with_tried_at(mut self, tried_at: DateTime<Utc>) -> Self {
        self.tried_at = tried_at;
        self
    }

    pub fn mark_untried(&mut self) {
        self.still_tried = false;
    }
}

impl Record for FoodTry {
    fn kind() -> EntityKind {
        EntityKind::FoodTry
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

    fn cmp_records(a: &Self, b: &Self) -> Ordering {
        b.tried_at.cmp(&a.tried_at).then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for FoodTry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.food_name, self.category, self.color)?;
        if !self.still_tried {
            write!(f, " [untried]")?;
        }
        Ok(())
    }
}
