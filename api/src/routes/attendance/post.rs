use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::Utc;
use validator::Validate;

use crate::{auth::AuthUser, response::ApiResponse};
use util::state::AppState;

use super::common::{
    AttendanceSessionResponse, CreateSessionReq, JoinSessionReq, JoinSessionResponse,
    service_error_response,
};
use db::models::class_membership::{Model as ClassMembership, Role};
use services::ServiceError;
use services::attendance_join::AttendanceJoinService;
use services::attendance_session::{AttendanceSessionService, CreateAttendanceSession};

/// POST /api/attendance/sessions
///
/// Opens a time-boxed attendance session for a class. The caller must be a
/// lecturer of that class (or an admin). The window defaults to 15 minutes;
/// supplying both coordinates makes the session geofenced.
pub async fn create_session(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<CreateSessionReq>,
) -> (StatusCode, Json<ApiResponse<AttendanceSessionResponse>>) {
    let db = state.db();

    if let Err(e) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(e.to_string())),
        );
    }

    if !claims.admin {
        match ClassMembership::has_role(db, claims.sub, body.class_id, Role::Lecturer).await {
            Ok(true) => {}
            Ok(false) => {
                return (
                    StatusCode::FORBIDDEN,
                    Json(ApiResponse::error(
                        "Only a lecturer of this class may open attendance sessions",
                    )),
                );
            }
            Err(e) => {
                return service_error_response(ServiceError::from(e));
            }
        }
    }

    let params = CreateAttendanceSession {
        class_id: body.class_id,
        created_by: claims.sub,
        duration_minutes: body.duration_minutes.unwrap_or(15),
        latitude: body.latitude,
        longitude: body.longitude,
        topic: body.topic,
        resource_links: body.resource_links,
    };

    match AttendanceSessionService::create(db, params).await {
        Ok(session) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                AttendanceSessionResponse::from_with_count(session, 0),
                "Attendance session created",
            )),
        ),
        Err(err) => service_error_response(err),
    }
}

/// POST /api/attendance/join
///
/// A member submits a code (plus optional device coordinates) against the
/// currently open session carrying that code. All seven join outcomes come
/// back as `200` with the flat `{ success, reason, message }` body; only
/// malformed input is an HTTP error.
pub async fn join_session(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<JoinSessionReq>,
) -> (StatusCode, Json<JoinSessionResponse>) {
    let db = state.db();

    if let Err(e) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(JoinSessionResponse {
                success: false,
                reason: None,
                message: e.to_string(),
            }),
        );
    }

    // the geofence check needs a full pair; anything less counts as no
    // location shared
    let coordinates = match (body.latitude, body.longitude) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => None,
    };

    match AttendanceJoinService::attempt_join(db, claims.sub, &body.code, coordinates, Utc::now())
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(JoinSessionResponse::from(outcome))),
        Err(ServiceError::InvalidInput(message)) => (
            StatusCode::BAD_REQUEST,
            Json(JoinSessionResponse {
                success: false,
                reason: None,
                message,
            }),
        ),
        Err(err) => {
            tracing::error!(error = %err, user = claims.sub, "join attempt failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(JoinSessionResponse {
                    success: false,
                    reason: None,
                    message: "Failed to record attendance".into(),
                }),
            )
        }
    }
}
