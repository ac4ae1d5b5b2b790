mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use dto::{format_time_of_day, MealView, TotalsResponse};
pub use repo::MealStore;
pub use repo_types::{
    DailyTotals, GoalProgress, MealRecord, NutrientProgress, NutritionFacts, NutritionGoals,
};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
