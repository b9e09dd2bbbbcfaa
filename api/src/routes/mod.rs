//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → Health check endpoint (public)
//! - `/attendance` → Attendance sessions, joins, live view, and reports
//!   (authenticated users)

use crate::auth::guards::allow_authenticated;
use crate::routes::{attendance::attendance_routes, health::health_routes};
use axum::{Router, middleware::from_fn};
use util::state::AppState;

pub mod attendance;
pub mod health;

/// Builds the complete application router for all HTTP endpoints.
///
/// All attendance routes sit behind the authentication guard; fine-grained
/// capability checks (who may open a session for a class, who may view a
/// live detail) happen in the handlers, because the class context arrives
/// in request bodies and code lookups rather than the path.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest(
            "/attendance",
            attendance_routes(app_state).route_layer(from_fn(allow_authenticated)),
        )
}
