use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::devices::ImageHandle;

/// Nutrition facts for one serving, as stored under `nutritionalInfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub calories: f64,
    #[serde(rename = "protein")]
    pub protein_g: f64,
    #[serde(rename = "carbs")]
    pub carbs_g: f64,
    #[serde(rename = "fat")]
    pub fat_g: f64,
}

impl NutritionFacts {
    pub const fn new(calories: f64, protein_g: f64, carbs_g: f64, fat_g: f64) -> Self {
        Self {
            calories,
            protein_g,
            carbs_g,
            fat_g,
        }
    }

    /// All values finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [self.calories, self.protein_g, self.carbs_g, self.fat_g]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// One logged meal. Field names follow the persisted `mealHistory` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub id: String,
    pub image: ImageHandle,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
    #[serde(rename = "foodName")]
    pub food_name: String,
    #[serde(rename = "nutritionalInfo")]
    pub facts: NutritionFacts,
}

/// Sum of the facts of today's meals. Derived, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyTotals {
    pub calories: f64,
    #[serde(rename = "protein")]
    pub protein_g: f64,
    #[serde(rename = "carbs")]
    pub carbs_g: f64,
    #[serde(rename = "fat")]
    pub fat_g: f64,
}

impl DailyTotals {
    pub fn add(&mut self, facts: &NutritionFacts) {
        self.calories += facts.calories;
        self.protein_g += facts.protein_g;
        self.carbs_g += facts.carbs_g;
        self.fat_g += facts.fat_g;
    }
}

impl From<NutritionFacts> for DailyTotals {
    fn from(f: NutritionFacts) -> Self {
        Self {
            calories: f.calories,
            protein_g: f.protein_g,
            carbs_g: f.carbs_g,
            fat_g: f.fat_g,
        }
    }
}

/// Daily targets shown next to the totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionGoals {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl Default for NutritionGoals {
    fn default() -> Self {
        Self {
            calories: 2000.0,
            protein_g: 150.0,
            carbs_g: 225.0,
            fat_g: 65.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NutrientProgress {
    pub consumed: f64,
    pub target: f64,
    pub remaining: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalProgress {
    pub calories: NutrientProgress,
    pub protein: NutrientProgress,
    pub carbs: NutrientProgress,
    pub fat: NutrientProgress,
}
