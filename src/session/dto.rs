use serde::{Deserialize, Serialize};
use time::UtcOffset;

use super::controller::{Notice, SessionSnapshot, SessionState};
use crate::{
    devices::ImageHandle,
    meals::{services, DailyTotals, GoalProgress, MealView, NutritionGoals},
};

/// Everything the host needs to render the screen.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub meals: Vec<MealView>,
    pub totals: DailyTotals,
    pub progress: GoalProgress,
    pub current: Option<MealView>,
    pub notice: Option<Notice>,
}

impl SessionView {
    pub fn new(snapshot: SessionSnapshot, offset: UtcOffset, goals: &NutritionGoals) -> Self {
        Self {
            state: snapshot.state,
            progress: services::progress(&snapshot.totals, goals),
            totals: snapshot.totals,
            meals: snapshot
                .meals
                .into_iter()
                .map(|m| MealView::new(m, offset))
                .collect(),
            current: snapshot.current.map(|m| MealView::new(m, offset)),
            notice: snapshot.notice,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeliverImageRequest {
    pub image: ImageHandle,
}
