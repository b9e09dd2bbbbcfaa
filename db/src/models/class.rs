use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, Set};
use serde::Serialize;

/// Represents a class (cohort) attendance sessions are scoped to.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "classes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The class code (e.g., "COS212").
    pub code: String,
    pub title: String,
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::class_membership::Entity")]
    Memberships,
    #[sea_orm(has_many = "super::attendance_session::Entity")]
    Sessions,
}

impl Related<super::class_membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(db: &DbConn, code: &str, title: &str, year: i32) -> Result<Self, DbErr> {
        let now = Utc::now();
        let class = ActiveModel {
            code: Set(code.to_owned()),
            title: Set(title.to_owned()),
            year: Set(year),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        class.insert(db).await
    }
}
