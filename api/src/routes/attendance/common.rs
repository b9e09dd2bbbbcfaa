use axum::Json;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::response::ApiResponse;
use services::ServiceError;
use services::attendance_join::JoinOutcome;
use services::attendance_report::{AbsenceReportRow, LiveSessionView};

/// Body of `POST /api/attendance/sessions`. Field names are the wire
/// contract with the existing clients.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionReq {
    pub class_id: i64,
    #[validate(range(min = 1, max = 480))]
    pub duration_minutes: Option<i64>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    pub topic: Option<String>,
    pub resource_links: Option<Vec<String>>,
}

/// Body of `POST /api/attendance/join`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionReq {
    #[validate(length(min = 1, message = "code is required"))]
    pub code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Flat join response; unlike the rest of the API this does not use the
/// `ApiResponse` envelope. `reason` is omitted when the join was accepted.
#[derive(Debug, Serialize)]
pub struct JoinSessionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub message: String,
}

impl From<JoinOutcome> for JoinSessionResponse {
    fn from(outcome: JoinOutcome) -> Self {
        Self {
            success: outcome.accepted(),
            reason: (!outcome.accepted()).then(|| outcome.tag()),
            message: outcome.message().to_owned(),
        }
    }
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSessionResponse {
    pub id: i64,
    pub class_id: i64,
    pub created_by: i64,
    pub code: String,
    pub topic: Option<String>,
    pub resource_links: Option<serde_json::Value>,
    pub start_time: String,
    pub end_time: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub joined_count: i64,
}

impl From<db::models::attendance_session::Model> for AttendanceSessionResponse {
    fn from(m: db::models::attendance_session::Model) -> Self {
        Self {
            id: m.id,
            class_id: m.class_id,
            created_by: m.created_by,
            code: m.code,
            topic: m.topic,
            resource_links: m.resource_links,
            start_time: m.start_time.to_rfc3339(),
            end_time: m.end_time.to_rfc3339(),
            latitude: m.latitude,
            longitude: m.longitude,
            joined_count: 0,
        }
    }
}

impl AttendanceSessionResponse {
    pub fn from_with_count(m: db::models::attendance_session::Model, joined_count: i64) -> Self {
        let mut base = Self::from(m);
        base.joined_count = joined_count;
        base
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecordResponse {
    pub member_id: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accepted: bool,
    pub rejection_reason: Option<String>,
    pub created_at: String,
}

impl From<db::models::attendance_record::Model> for AttendanceRecordResponse {
    fn from(r: db::models::attendance_record::Model) -> Self {
        Self {
            member_id: r.user_id,
            latitude: r.latitude,
            longitude: r.longitude,
            accepted: r.accepted,
            rejection_reason: r.rejection_reason,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

/// The opener's poll target: the session fields plus live counts.
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LiveViewResponse {
    #[serde(flatten)]
    pub session: AttendanceSessionResponse,
    pub accepted_count: i64,
    pub records: Vec<AttendanceRecordResponse>,
}

impl From<LiveSessionView> for LiveViewResponse {
    fn from(view: LiveSessionView) -> Self {
        Self {
            session: AttendanceSessionResponse::from_with_count(view.session, view.joined_count),
            accepted_count: view.accepted_count,
            records: view.records.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub class_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceReportRowResponse {
    pub member_id: i64,
    pub member_name: String,
    pub cohort_name: String,
    pub total_sessions: i64,
    pub accepted_sessions: i64,
    pub attendance_rate: f64,
    pub absence_rate: f64,
}

impl From<AbsenceReportRow> for AbsenceReportRowResponse {
    fn from(row: AbsenceReportRow) -> Self {
        Self {
            member_id: row.member_id,
            member_name: row.member_name,
            cohort_name: row.cohort_name,
            total_sessions: row.total_sessions,
            accepted_sessions: row.accepted_sessions,
            attendance_rate: row.attendance_rate,
            absence_rate: row.absence_rate,
        }
    }
}

/// Maps a service failure onto the enveloped error responses every
/// non-join endpoint uses.
pub fn service_error_response<T>(err: ServiceError) -> (StatusCode, Json<ApiResponse<T>>)
where
    T: Serialize + Default,
{
    match &err {
        ServiceError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(err.to_string())),
        ),
        ServiceError::Forbidden(_) => (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error(err.to_string())),
        ),
        ServiceError::InvalidInput(_) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(err.to_string())),
        ),
        ServiceError::CodeExhausted | ServiceError::Db(_) => {
            tracing::error!(error = %err, "attendance service failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Internal server error")),
            )
        }
    }
}
