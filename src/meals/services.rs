use super::repo_types::{DailyTotals, GoalProgress, MealRecord, NutrientProgress, NutritionGoals};

/// Sum every nutrient over `records`. Empty input gives all zeros.
pub fn recompute(records: &[MealRecord]) -> DailyTotals {
    records.iter().fold(DailyTotals::default(), |mut acc, meal| {
        acc.add(&meal.facts);
        acc
    })
}

pub fn progress(totals: &DailyTotals, goals: &NutritionGoals) -> GoalProgress {
    GoalProgress {
        calories: nutrient(totals.calories, goals.calories),
        protein: nutrient(totals.protein_g, goals.protein_g),
        carbs: nutrient(totals.carbs_g, goals.carbs_g),
        fat: nutrient(totals.fat_g, goals.fat_g),
    }
}

fn nutrient(consumed: f64, target: f64) -> NutrientProgress {
    let percent = if target > 0.0 {
        consumed / target * 100.0
    } else {
        0.0
    };
    NutrientProgress {
        consumed,
        target,
        remaining: (target - consumed).max(0.0),
        percent,
    }
}
