use serde::Serialize;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};

use super::repo_types::{DailyTotals, GoalProgress, MealRecord, NutritionFacts};
use crate::devices::ImageHandle;

const TIME_OF_DAY: &[FormatItem<'static>] =
    format_description!("[hour repr:12 padding:none]:[minute] [period]");

/// A logged meal as the host renders it.
#[derive(Debug, Serialize)]
pub struct MealView {
    pub id: String,
    pub image: ImageHandle,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Local time of day, e.g. `1:05 PM`.
    pub time: String,
    pub food_name: String,
    pub nutrition: NutritionFacts,
}

impl MealView {
    pub fn new(meal: MealRecord, offset: UtcOffset) -> Self {
        Self {
            time: format_time_of_day(meal.captured_at, offset),
            id: meal.id,
            image: meal.image,
            timestamp: meal.captured_at,
            food_name: meal.food_name,
            nutrition: meal.facts,
        }
    }
}

pub fn format_time_of_day(at: OffsetDateTime, offset: UtcOffset) -> String {
    at.to_offset(offset)
        .format(TIME_OF_DAY)
        .unwrap_or_else(|_| at.to_offset(offset).time().to_string())
}

#[derive(Debug, Serialize)]
pub struct TotalsResponse {
    pub meal_count: usize,
    pub totals: DailyTotals,
    pub progress: GoalProgress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn twelve_hour_clock_labels() {
        let utc = UtcOffset::UTC;
        assert_eq!(format_time_of_day(datetime!(2024-05-01 00:07 UTC), utc), "12:07 AM");
        assert_eq!(format_time_of_day(datetime!(2024-05-01 09:30 UTC), utc), "9:30 AM");
        assert_eq!(format_time_of_day(datetime!(2024-05-01 12:00 UTC), utc), "12:00 PM");
        assert_eq!(format_time_of_day(datetime!(2024-05-01 23:59 UTC), utc), "11:59 PM");
    }

    #[test]
    fn label_uses_local_offset() {
        assert_eq!(
            format_time_of_day(datetime!(2024-05-01 13:05 UTC), offset!(+2)),
            "3:05 PM"
        );
    }
}
