use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{DeliverImageRequest, SessionView};
use crate::{devices::SourceKind, state::AppState};

type Rejection = (StatusCode, String);

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/session/capture", post(start_capture))
        .route("/session/pick", post(start_pick))
        .route("/session/cancel", post(cancel_session))
        .route("/session/dismiss", post(dismiss_results))
        .route("/session/save", post(save_results))
}

pub fn device_routes() -> Router<AppState> {
    Router::new()
        .route("/devices/:source/image", post(deliver_image))
        .route("/devices/:source/cancel", post(cancel_device))
}

fn view(state: &AppState) -> SessionView {
    SessionView::new(
        state.session.snapshot(),
        state.config.utc_offset,
        &state.config.goals,
    )
}

fn busy(state: &AppState) -> Rejection {
    (
        StatusCode::CONFLICT,
        format!("session is {:?}", state.session.session_state()),
    )
}

#[instrument(skip(state))]
pub async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(view(&state))
}

#[instrument(skip(state))]
pub async fn start_capture(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), Rejection> {
    if !state.session.start_capture() {
        return Err(busy(&state));
    }
    Ok((StatusCode::ACCEPTED, Json(view(&state))))
}

#[instrument(skip(state))]
pub async fn start_pick(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), Rejection> {
    if !state.session.start_pick() {
        return Err(busy(&state));
    }
    Ok((StatusCode::ACCEPTED, Json(view(&state))))
}

#[instrument(skip(state))]
pub async fn cancel_session(State(state): State<AppState>) -> Json<SessionView> {
    state.session.cancel_session();
    Json(view(&state))
}

#[instrument(skip(state))]
pub async fn dismiss_results(State(state): State<AppState>) -> Json<SessionView> {
    state.session.dismiss_results();
    Json(view(&state))
}

#[instrument(skip(state))]
pub async fn save_results(State(state): State<AppState>) -> Json<SessionView> {
    state.session.save_results();
    Json(view(&state))
}

/// POST /devices/:source/image { "image": "file:///..." }
#[instrument(skip(state, body))]
pub async fn deliver_image(
    State(state): State<AppState>,
    Path(source): Path<SourceKind>,
    Json(body): Json<DeliverImageRequest>,
) -> Result<StatusCode, Rejection> {
    if !body.image.is_valid() {
        return Err((StatusCode::BAD_REQUEST, "image is required".into()));
    }
    if !state.source(source).deliver(body.image).await {
        warn!(%source, "image delivered with no session waiting");
        return Err((
            StatusCode::CONFLICT,
            format!("no session is waiting on the {}", source),
        ));
    }
    Ok(StatusCode::ACCEPTED)
}

#[instrument(skip(state))]
pub async fn cancel_device(
    State(state): State<AppState>,
    Path(source): Path<SourceKind>,
) -> Result<StatusCode, Rejection> {
    if !state.source(source).cancel().await {
        return Err((
            StatusCode::CONFLICT,
            format!("no session is waiting on the {}", source),
        ));
    }
    Ok(StatusCode::ACCEPTED)
}
