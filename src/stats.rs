//! Derived views over in-memory collections.
//!
//! Everything here is a pure function over a snapshot slice; the display
//! widgets call these on demand and nothing is cached.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::models::{
    FeedingLog, FoodCategory, FoodColor, FoodTry, Nutrient, Recipe, ShoppingItem, SleepLog,
};

/// Per-day feeding aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct DayFeeding {
    pub date: NaiveDate,
    pub count: usize,
    pub total_ml: f64,
}

/// Feeding counts and bottle volume for the seven days starting at
/// `week_start`, one entry per day, in order.
pub fn feeding_week(logs: &[FeedingLog], week_start: NaiveDate) -> Vec<DayFeeding> {
    (0..7)
        .map(|offset| {
            let date = week_start + Duration::days(offset);
            let day_logs = logs.iter().filter(|l| local_date(l.fed_at) == date);
            let mut count = 0;
            let mut total_ml = 0.0;
            for log in day_logs {
                count += 1;
                total_ml += log.amount_ml.unwrap_or(0.0);
            }
            DayFeeding {
                date,
                count,
                total_ml,
            }
        })
        .collect()
}

/// Total completed sleep minutes per day for the seven days starting at
/// `week_start`. Ongoing sessions are excluded.
pub fn sleep_week(logs: &[SleepLog], week_start: NaiveDate) -> Vec<(NaiveDate, i64)> {
    (0..7)
        .map(|offset| {
            let date = week_start + Duration::days(offset);
            let minutes = logs
                .iter()
                .filter(|l| local_date(l.started_at) == date)
                .filter_map(|l| l.duration_minutes())
                .sum();
            (date, minutes)
        })
        .collect()
}

/// How many foods of each color are currently marked tried.
pub fn food_color_distribution(tries: &[FoodTry]) -> HashMap<FoodColor, usize> {
    let mut counts = HashMap::new();
    for t in tries.iter().filter(|t| t.still_tried) {
        *counts.entry(t.color).or_insert(0) += 1;
    }
    counts
}

/// How many foods of each category are currently marked tried.
pub fn food_category_distribution(tries: &[FoodTry]) -> HashMap<FoodCategory, usize> {
    let mut counts = HashMap::new();
    for t in tries.iter().filter(|t| t.still_tried) {
        *counts.entry(t.category).or_insert(0) += 1;
    }
    counts
}

/// Number of foods currently marked tried.
pub fn still_tried_count(tries: &[FoodTry]) -> usize {
    tries.iter().filter(|t| t.still_tried).count()
}

/// Sums nutrients across recipes, keyed by name and unit.
pub fn nutrient_totals(recipes: &[Recipe]) -> Vec<Nutrient> {
    let mut totals: HashMap<(String, String), f64> = HashMap::new();
    for recipe in recipes {
        for nutrient in &recipe.nutrients {
            *totals
                .entry((nutrient.name.clone(), nutrient.unit.clone()))
                .or_insert(0.0) += nutrient.amount;
        }
    }
    let mut result: Vec<Nutrient> = totals
        .into_iter()
        .map(|((name, unit), amount)| Nutrient::new(name, amount, unit))
        .collect();
    result.sort_by(|a, b| a.name.cmp(&b.name));
    result
}

/// Count of items still to buy.
pub fn unchecked_count(items: &[ShoppingItem]) -> usize {
    items.iter().filter(|i| !i.checked).count()
}

/// The Monday of the week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedingKind, Ingredient};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_feeding_week() {
        let child = Uuid::new_v4();
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let logs = vec![
            FeedingLog::new(child, FeedingKind::Bottle, "u")
                .with_fed_at(at(2026, 3, 2, 8))
                .with_amount_ml(120.0),
            FeedingLog::new(child, FeedingKind::Bottle, "u")
                .with_fed_at(at(2026, 3, 2, 14))
                .with_amount_ml(90.0),
            FeedingLog::new(child, FeedingKind::Solid, "u").with_fed_at(at(2026, 3, 4, 12)),
            // outside the week
            FeedingLog::new(child, FeedingKind::Bottle, "u").with_fed_at(at(2026, 3, 10, 8)),
        ];

        let week = feeding_week(&logs, monday);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].count, 2);
        assert_eq!(week[0].total_ml, 210.0);
        assert_eq!(week[2].count, 1);
        assert_eq!(week[6].count, 0);
    }

    #[test]
    fn test_sleep_week_excludes_ongoing() {
        let child = Uuid::new_v4();
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let start = at(2026, 3, 2, 13);
        let logs = vec![
            SleepLog::new(child, start, "u").with_ended_at(start + Duration::minutes(80)),
            SleepLog::new(child, at(2026, 3, 2, 20), "u"), // ongoing
        ];

        let week = sleep_week(&logs, monday);
        assert_eq!(week[0], (monday, 80));
    }

    #[test]
    fn test_color_distribution_skips_untried() {
        let child = Uuid::new_v4();
        let mut beet = FoodTry::new(child, "beet", FoodCategory::Vegetable, FoodColor::Red, "u");
        beet.mark_untried();
        let tries = vec![
            FoodTry::new(child, "pea", FoodCategory::Vegetable, FoodColor::Green, "u"),
            FoodTry::new(child, "kiwi", FoodCategory::Fruit, FoodColor::Green, "u"),
            beet,
        ];

        let colors = food_color_distribution(&tries);
        assert_eq!(colors.get(&FoodColor::Green), Some(&2));
        assert_eq!(colors.get(&FoodColor::Red), None);
        assert_eq!(still_tried_count(&tries), 2);
    }

    #[test]
    fn test_nutrient_totals_sum_by_name_and_unit() {
        let recipes = vec![
            Recipe::new("a", "u")
                .with_ingredients(vec![Ingredient::new("oats", 1.0, "cup")])
                .with_nutrients(vec![Nutrient::new("iron", 1.0, "mg")]),
            Recipe::new("b", "u").with_nutrients(vec![
                Nutrient::new("iron", 0.5, "mg"),
                Nutrient::new("calcium", 120.0, "mg"),
            ]),
        ];

        let totals = nutrient_totals(&recipes);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].name, "calcium");
        assert_eq!(totals[1].amount, 1.5);
    }

    #[test]
    fn test_week_start_of() {
        let thursday = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        assert_eq!(
            week_start_of(thursday),
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
    }
}
