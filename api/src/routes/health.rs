use crate::response::ApiResponse;
use axum::{Json, Router, response::IntoResponse, routing::get};

/// Builds the `/health` route group.
///
/// This includes a single `GET /health` endpoint that returns a basic success
/// message. Useful for uptime checks, load balancers, or deployment health
/// monitoring.
pub fn health_routes() -> Router {
    Router::new().route("/", get(health_check))
}

/// GET /health
///
/// Returns a simple success response to indicate the API is running.
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::success("OK", "Health check passed"))
}
