use chrono::{DateTime, Duration, Utc};
use db::models::attendance_session::{ActiveModel, Column, Entity};
use db::models::class;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::error::ServiceError;
use crate::session_code;

pub use db::models::attendance_session::Model as AttendanceSession;

/// Bound on the generate-then-check code loop. The 6-digit space makes a
/// collision against the handful of live sessions unlikely; exhausting the
/// bound signals storage trouble rather than contention.
const MAX_CODE_ATTEMPTS: usize = 16;

#[derive(Debug, Clone)]
pub struct CreateAttendanceSession {
    pub class_id: i64,
    pub created_by: i64,
    pub duration_minutes: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub topic: Option<String>,
    pub resource_links: Option<Vec<String>>,
}

pub struct AttendanceSessionService;

impl AttendanceSessionService {
    /// Opens a session: window starts now and closes `duration_minutes`
    /// later. The join code is drawn fresh until it collides with no
    /// currently valid session.
    pub async fn create(
        db: &DatabaseConnection,
        params: CreateAttendanceSession,
    ) -> Result<AttendanceSession, ServiceError> {
        if params.duration_minutes <= 0 {
            return Err(ServiceError::InvalidInput(
                "durationMinutes must be positive".into(),
            ));
        }
        if params.latitude.is_some() != params.longitude.is_some() {
            return Err(ServiceError::InvalidInput(
                "latitude and longitude must be supplied together".into(),
            ));
        }

        if class::Entity::find_by_id(params.class_id)
            .one(db)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!(
                "Class ID {}",
                params.class_id
            )));
        }

        let now = Utc::now();
        let code = Self::allocate_code(db, now).await?;
        debug!(class_id = params.class_id, code = %code, "opening attendance session");

        let session = ActiveModel {
            class_id: Set(params.class_id),
            created_by: Set(params.created_by),
            code: Set(code),
            topic: Set(params.topic),
            resource_links: Set(params
                .resource_links
                .map(|links| serde_json::json!(links))),
            start_time: Set(now),
            end_time: Set(now + Duration::minutes(params.duration_minutes)),
            latitude: Set(params.latitude),
            longitude: Set(params.longitude),
            created_at: Set(now),
            ..Default::default()
        };

        Ok(session.insert(db).await?)
    }

    async fn allocate_code(
        db: &DatabaseConnection,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = session_code::generate();
            if Self::find_valid_by_code(db, &candidate, now).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(ServiceError::CodeExhausted)
    }

    /// The session a submitted code refers to. Expired sessions may share a
    /// code with a live one; ordering by `end_time` puts the live one (there
    /// is at most one) ahead of every expired holder.
    pub async fn find_by_code(
        db: &DatabaseConnection,
        code: &str,
    ) -> Result<Option<AttendanceSession>, ServiceError> {
        Ok(Entity::find()
            .filter(Column::Code.eq(code))
            .order_by_desc(Column::EndTime)
            .one(db)
            .await?)
    }

    /// Like `find_by_code`, restricted to sessions whose window is open at
    /// `now`.
    pub async fn find_valid_by_code(
        db: &DatabaseConnection,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceSession>, ServiceError> {
        Ok(Entity::find()
            .filter(Column::Code.eq(code))
            .filter(Column::EndTime.gte(now))
            .one(db)
            .await?)
    }

    pub async fn find_by_id(
        db: &DatabaseConnection,
        id: i64,
    ) -> Result<Option<AttendanceSession>, ServiceError> {
        Ok(Entity::find_by_id(id).one(db).await?)
    }

    /// An opener's session history, newest first.
    pub async fn list_for_opener(
        db: &DatabaseConnection,
        opener_id: i64,
    ) -> Result<Vec<AttendanceSession>, ServiceError> {
        Ok(Entity::find()
            .filter(Column::CreatedBy.eq(opener_id))
            .order_by_desc(Column::StartTime)
            .all(db)
            .await?)
    }

    /// All sessions ever held for a class, for reporting.
    pub async fn list_for_class(
        db: &DatabaseConnection,
        class_id: i64,
    ) -> Result<Vec<AttendanceSession>, ServiceError> {
        Ok(Entity::find()
            .filter(Column::ClassId.eq(class_id))
            .order_by_desc(Column::StartTime)
            .all(db)
            .await?)
    }
}
