use std::collections::HashMap;

use db::models::{attendance_record, attendance_session, class, class_membership, user};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait,
};

use crate::error::ServiceError;

/// Read-only projection over the join records of one session, polled by the
/// opener while the window is open.
#[derive(Debug)]
pub struct LiveSessionView {
    pub session: attendance_session::Model,
    pub joined_count: i64,
    pub accepted_count: i64,
    pub records: Vec<attendance_record::Model>,
}

/// One member's line in the cohort absence report.
#[derive(Debug, Clone, PartialEq)]
pub struct AbsenceReportRow {
    pub member_id: i64,
    pub member_name: String,
    pub cohort_name: String,
    pub total_sessions: i64,
    pub accepted_sessions: i64,
    pub attendance_rate: f64,
    pub absence_rate: f64,
}

pub struct AttendanceReportService;

impl AttendanceReportService {
    /// Counts and records for one session.
    ///
    /// `caller` of `Some(id)` enforces the opener capability; `None` (the
    /// platform admin path) skips it.
    pub async fn live_view(
        db: &DatabaseConnection,
        session_id: i64,
        caller: Option<i64>,
    ) -> Result<LiveSessionView, ServiceError> {
        let Some(session) = attendance_session::Entity::find_by_id(session_id)
            .one(db)
            .await?
        else {
            return Err(ServiceError::NotFound(format!(
                "Attendance session ID {session_id}"
            )));
        };

        if let Some(caller_id) = caller {
            if caller_id != session.created_by {
                return Err(ServiceError::Forbidden(
                    "Only the session opener may view the live detail".into(),
                ));
            }
        }

        let records = attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session_id))
            .order_by_asc(attendance_record::Column::CreatedAt)
            .all(db)
            .await?;

        let joined_count = records.len() as i64;
        let accepted_count = records.iter().filter(|r| r.accepted).count() as i64;

        Ok(LiveSessionView {
            session,
            joined_count,
            accepted_count,
            records,
        })
    }

    /// Join-record counts per session for a batch of sessions, one grouped
    /// scan instead of a count query each.
    pub async fn joined_counts_for(
        db: &DatabaseConnection,
        session_ids: &[i64],
    ) -> Result<HashMap<i64, i64>, ServiceError> {
        if session_ids.is_empty() {
            return Ok(HashMap::new());
        }

        #[derive(FromQueryResult)]
        struct Row {
            session_id: i64,
            cnt: i64,
        }

        let rows: Vec<Row> = attendance_record::Entity::find()
            .select_only()
            .column(attendance_record::Column::SessionId)
            .column_as(
                Expr::expr(Func::count(Expr::col(attendance_record::Column::UserId))),
                "cnt",
            )
            .filter(attendance_record::Column::SessionId.is_in(session_ids.iter().cloned()))
            .group_by(attendance_record::Column::SessionId)
            .into_model::<Row>()
            .all(db)
            .await?;

        Ok(rows.into_iter().map(|r| (r.session_id, r.cnt)).collect())
    }

    /// The cohort-wide absence report: one row per student member, over every
    /// session the cohort has held. No filter walks all cohorts.
    pub async fn absence_report(
        db: &DatabaseConnection,
        class_id: Option<i64>,
    ) -> Result<Vec<AbsenceReportRow>, ServiceError> {
        let classes = match class_id {
            Some(id) => {
                let Some(found) = class::Entity::find_by_id(id).one(db).await? else {
                    return Err(ServiceError::NotFound(format!("Class ID {id}")));
                };
                vec![found]
            }
            None => {
                class::Entity::find()
                    .order_by_asc(class::Column::Id)
                    .all(db)
                    .await?
            }
        };

        let mut report = Vec::new();
        for class in classes {
            report.extend(Self::class_report(db, &class).await?);
        }
        Ok(report)
    }

    async fn class_report(
        db: &DatabaseConnection,
        class: &class::Model,
    ) -> Result<Vec<AbsenceReportRow>, ServiceError> {
        let memberships = class_membership::Model::students_of_class(db, class.id).await?;
        if memberships.is_empty() {
            return Ok(Vec::new());
        }

        let total_sessions = attendance_session::Entity::find()
            .filter(attendance_session::Column::ClassId.eq(class.id))
            .count(db)
            .await? as i64;

        #[derive(FromQueryResult)]
        struct Row {
            user_id: i64,
            cnt: i64,
        }

        let class_sessions_subq = attendance_session::Entity::find()
            .select_only()
            .column(attendance_session::Column::Id)
            .filter(attendance_session::Column::ClassId.eq(class.id))
            .into_query();

        let accepted_rows: Vec<Row> = attendance_record::Entity::find()
            .select_only()
            .column(attendance_record::Column::UserId)
            .column_as(
                Expr::expr(Func::count(Expr::col(attendance_record::Column::SessionId))),
                "cnt",
            )
            .filter(attendance_record::Column::Accepted.eq(true))
            .filter(attendance_record::Column::SessionId.in_subquery(class_sessions_subq))
            .group_by(attendance_record::Column::UserId)
            .into_model::<Row>()
            .all(db)
            .await?;
        let accepted_by_member: HashMap<i64, i64> =
            accepted_rows.into_iter().map(|r| (r.user_id, r.cnt)).collect();

        let member_ids: Vec<i64> = memberships.iter().map(|m| m.user_id).collect();
        let members = user::Entity::find()
            .filter(user::Column::Id.is_in(member_ids))
            .order_by_asc(user::Column::Username)
            .all(db)
            .await?;

        let mut rows = Vec::with_capacity(members.len());
        for member in members {
            let accepted_sessions = *accepted_by_member.get(&member.id).unwrap_or(&0);
            // a cohort with no sessions yet counts as full attendance
            let attendance_rate = if total_sessions == 0 {
                100.0
            } else {
                accepted_sessions as f64 / total_sessions as f64 * 100.0
            };
            rows.push(AbsenceReportRow {
                member_id: member.id,
                member_name: member.username,
                cohort_name: class.code.clone(),
                total_sessions,
                accepted_sessions,
                attendance_rate,
                absence_rate: 100.0 - attendance_rate,
            });
        }
        Ok(rows)
    }
}
