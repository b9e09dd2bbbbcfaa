use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// A time-boxed attendance session opened by a lecturer for one class.
///
/// Rows are never mutated after creation; a session stops accepting joins
/// when its window elapses, which is derived from `end_time` on every read
/// rather than stored as a flag.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "attendance_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub class_id: i64,
    pub created_by: i64,
    /// Human-enterable join code; unique among sessions whose window has
    /// not yet elapsed, not globally.
    pub code: String,
    pub topic: Option<String>,
    pub resource_links: Option<Json>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id"
    )]
    Class,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The single shared validity predicate: the window is inclusive of
    /// `end_time` itself.
    #[inline]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.end_time
    }

    /// A session carrying both origin coordinates rejects joins by distance.
    #[inline]
    pub fn is_geofenced(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}
