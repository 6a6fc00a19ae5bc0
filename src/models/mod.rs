//! Entity types tracked by the sync core, one bounded context each.

mod feeding;
mod food_try;
mod ingredient;
mod meal_plan;
mod meal_type;
mod medication;
mod nutrient;
mod profile;
mod recipe;
mod shopping;
mod sleep;

pub use feeding::{FeedingKind, FeedingLog};
pub use food_try::{FoodCategory, FoodColor, FoodTry};
pub use ingredient::Ingredient;
pub use meal_plan::MealPlanEntry;
pub use meal_type::MealType;
pub use medication::MedicationLog;
pub use nutrient::Nutrient;
pub use profile::ChildProfile;
pub use recipe::Recipe;
pub use shopping::ShoppingItem;
pub use sleep::SleepLog;
