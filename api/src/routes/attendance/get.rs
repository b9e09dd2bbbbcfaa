//! Attendance read-only routes: opener history, live session view, and the
//! cohort absence report.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{auth::AuthUser, response::ApiResponse};
use util::state::AppState;

use super::common::{
    AbsenceReportRowResponse, AttendanceSessionResponse, LiveViewResponse, ReportQuery,
    service_error_response,
};
use db::models::class_membership::{Model as ClassMembership, Role};
use services::ServiceError;
use services::attendance_report::AttendanceReportService;
use services::attendance_session::AttendanceSessionService;

/// GET /api/attendance/sessions
///
/// The caller's own session history, newest first, each with its join count.
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<Vec<AttendanceSessionResponse>>>) {
    let db = state.db();

    let sessions = match AttendanceSessionService::list_for_opener(db, claims.sub).await {
        Ok(sessions) => sessions,
        Err(err) => return service_error_response(err),
    };

    let session_ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
    let counts = match AttendanceReportService::joined_counts_for(db, &session_ids).await {
        Ok(counts) => counts,
        Err(err) => return service_error_response(err),
    };

    let data = sessions
        .into_iter()
        .map(|s| {
            let joined = *counts.get(&s.id).unwrap_or(&0);
            AttendanceSessionResponse::from_with_count(s, joined)
        })
        .collect();

    (
        StatusCode::OK,
        Json(ApiResponse::success(data, "Attendance sessions retrieved")),
    )
}

/// GET /api/attendance/sessions/{session_id}
///
/// The opener's live view: session fields, join counts, and the individual
/// records. Clients poll this every few seconds while the window is open.
/// Admins may view any session; everyone else only their own.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<LiveViewResponse>>) {
    let db = state.db();
    let caller = if claims.admin { None } else { Some(claims.sub) };

    match AttendanceReportService::live_view(db, session_id, caller).await {
        Ok(view) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                LiveViewResponse::from(view),
                "Attendance session retrieved",
            )),
        ),
        Err(err) => service_error_response(err),
    }
}

/// GET /api/attendance/report?classId=...
///
/// Absence report rows, one per student member. Filtered to one class the
/// caller lectures (or any class for admins); the unfiltered form walks
/// every cohort and is admin-only.
pub async fn absence_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<Vec<AbsenceReportRowResponse>>>) {
    let db = state.db();

    if !claims.admin {
        let permitted = match query.class_id {
            Some(class_id) => {
                match ClassMembership::has_role(db, claims.sub, class_id, Role::Lecturer).await {
                    Ok(is_lecturer) => is_lecturer,
                    Err(e) => return service_error_response(ServiceError::from(e)),
                }
            }
            None => false,
        };
        if !permitted {
            return (
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error(
                    "Only a lecturer of the class may view its absence report",
                )),
            );
        }
    }

    match AttendanceReportService::absence_report(db, query.class_id).await {
        Ok(rows) => {
            let data: Vec<AbsenceReportRowResponse> = rows.into_iter().map(Into::into).collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(data, "Absence report generated")),
            )
        }
        Err(err) => service_error_response(err),
    }
}
