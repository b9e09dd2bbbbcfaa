use axum::{
    Router,
    routing::{get, post},
};
use util::state::AppState;

mod common;
mod get;
mod post;

pub use get::{absence_report, get_session, list_sessions};
pub use post::{create_session, join_session};

pub fn attendance_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/{session_id}", get(get_session))
        .route("/join", post(join_session))
        .route("/report", get(absence_report))
        .with_state(app_state)
}
