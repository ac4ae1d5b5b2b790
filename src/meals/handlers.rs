use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{info, instrument};

use super::{
    dto::{MealView, TotalsResponse},
    services,
};
use crate::{app::internal, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals).delete(clear_meals))
        .route("/meals/totals", get(get_totals))
}

#[instrument(skip(state))]
pub async fn list_meals(State(state): State<AppState>) -> Json<Vec<MealView>> {
    let offset = state.config.utc_offset;
    let items = state
        .session
        .todays_meals()
        .into_iter()
        .map(|m| MealView::new(m, offset))
        .collect();
    Json(items)
}

#[instrument(skip(state))]
pub async fn get_totals(State(state): State<AppState>) -> Json<TotalsResponse> {
    Json(totals_response(&state))
}

pub(crate) fn totals_response(state: &AppState) -> TotalsResponse {
    let totals = state.session.daily_totals();
    TotalsResponse {
        meal_count: state.session.todays_meals().len(),
        totals,
        progress: services::progress(&totals, &state.config.goals),
    }
}

/// DELETE /meals: the "Clear Meal History" action.
#[instrument(skip(state))]
pub async fn clear_meals(
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.session.clear_history().await.map_err(internal)?;
    info!("meal history cleared by user");
    Ok(StatusCode::NO_CONTENT)
}
