use serde::{Deserialize, Serialize};
use std::fmt;

/// One recipe ingredient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
        }
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{} {}", self.quantity, self.name)
        } else {
            write!(f, "{} {} {}", self.quantity, self.unit, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_display() {
        let ingredient = Ingredient::new("oats", 0.5, "cup");
        assert_eq!(format!("{}", ingredient), "0.5 cup oats");
    }

    #[test]
    fn test_ingredient_display_no_unit() {
        let ingredient = Ingredient::new("banana", 1.0, "");
        assert_eq!(format!("{}", ingredient), "1 banana");
    }
}
