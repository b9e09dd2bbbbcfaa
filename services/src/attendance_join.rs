use chrono::{DateTime, Utc};
use db::models::attendance_record::{
    ActiveModel as RecordActiveModel, Column as RecordColumn, Entity as RecordEntity,
};
use db::models::class_membership::{Model as ClassMembership, Role};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set};
use tracing::debug;

use crate::attendance_session::AttendanceSessionService;
use crate::error::ServiceError;
use crate::geofence;

pub use db::models::attendance_record::Model as AttendanceRecord;

/// Tagged result of one join attempt.
///
/// Every variant is a normal, expected response the caller branches on for
/// user-facing messaging; none of them is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Accepted,
    InvalidCode,
    Expired,
    WrongCohort,
    AlreadyJoined,
    LocationRejected,
    LocationMissing,
}

impl JoinOutcome {
    pub fn accepted(self) -> bool {
        matches!(self, JoinOutcome::Accepted)
    }

    /// Stable wire tag.
    pub fn tag(self) -> &'static str {
        match self {
            JoinOutcome::Accepted => "ACCEPTED",
            JoinOutcome::InvalidCode => "INVALID_CODE",
            JoinOutcome::Expired => "EXPIRED",
            JoinOutcome::WrongCohort => "WRONG_COHORT",
            JoinOutcome::AlreadyJoined => "ALREADY_JOINED",
            JoinOutcome::LocationRejected => "LOCATION_REJECTED",
            JoinOutcome::LocationMissing => "LOCATION_MISSING",
        }
    }

    /// The human-readable line the UI renders alongside the tag.
    pub fn message(self) -> &'static str {
        match self {
            JoinOutcome::Accepted => "Attendance recorded",
            JoinOutcome::InvalidCode => "No session matches this code",
            JoinOutcome::Expired => "This code has expired",
            JoinOutcome::WrongCohort => "This session belongs to a different class",
            JoinOutcome::AlreadyJoined => "Attendance was already recorded for this session",
            JoinOutcome::LocationRejected => "You are too far from the session location",
            JoinOutcome::LocationMissing => "Your location was not shared",
        }
    }
}

pub struct AttendanceJoinService;

impl AttendanceJoinService {
    /// Evaluates one join attempt.
    ///
    /// The check order is fixed: code lookup, expiry, cohort membership,
    /// duplicate, geofence. Only geofence failures and acceptance write a
    /// record, and a written record (accepted or not) consumes the member's
    /// single attempt for the session.
    pub async fn attempt_join(
        db: &DatabaseConnection,
        user_id: i64,
        code: &str,
        coordinates: Option<(f64, f64)>,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome, ServiceError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ServiceError::InvalidInput("code must not be blank".into()));
        }

        let Some(session) = AttendanceSessionService::find_by_code(db, code).await? else {
            return Ok(JoinOutcome::InvalidCode);
        };

        if !session.is_valid_at(now) {
            return Ok(JoinOutcome::Expired);
        }

        if !ClassMembership::has_role(db, user_id, session.class_id, Role::Student).await? {
            return Ok(JoinOutcome::WrongCohort);
        }

        if RecordEntity::find_by_id((session.id, user_id))
            .one(db)
            .await?
            .is_some()
        {
            return Ok(JoinOutcome::AlreadyJoined);
        }

        let outcome = match (session.latitude, session.longitude) {
            (Some(origin_lat), Some(origin_lon)) => match coordinates {
                None => JoinOutcome::LocationMissing,
                Some((lat, lon)) => {
                    let distance = geofence::distance_meters(origin_lat, origin_lon, lat, lon);
                    if geofence::within_radius(distance, geofence::GEOFENCE_RADIUS_METERS) {
                        JoinOutcome::Accepted
                    } else {
                        debug!(session_id = session.id, user_id, distance, "outside geofence");
                        JoinOutcome::LocationRejected
                    }
                }
            },
            _ => JoinOutcome::Accepted,
        };

        let record = RecordActiveModel {
            session_id: Set(session.id),
            user_id: Set(user_id),
            latitude: Set(coordinates.map(|(lat, _)| lat)),
            longitude: Set(coordinates.map(|(_, lon)| lon)),
            accepted: Set(outcome.accepted()),
            rejection_reason: Set((!outcome.accepted()).then(|| outcome.tag().to_owned())),
            created_at: Set(now),
        };

        // Two concurrent attempts by the same member race to this insert;
        // the composite primary key arbitrates and the loser reads back as
        // a duplicate.
        let inserted = RecordEntity::insert(record)
            .on_conflict(
                OnConflict::columns([RecordColumn::SessionId, RecordColumn::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec(db)
            .await;

        match inserted {
            Ok(_) => Ok(outcome),
            Err(DbErr::RecordNotInserted) => Ok(JoinOutcome::AlreadyJoined),
            Err(err) => Err(err.into()),
        }
    }
}
