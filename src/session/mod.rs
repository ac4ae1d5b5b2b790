mod controller;
mod dto;
pub mod handlers;

pub use controller::{
    Notice, NoticeKind, SessionController, SessionDeps, SessionSnapshot, SessionState,
};
pub use dto::{DeliverImageRequest, SessionView};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::session_routes())
        .merge(handlers::device_routes())
}
