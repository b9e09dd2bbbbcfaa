use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, Set};
use serde::Serialize;

/// Represents a user in the `users` table.
///
/// Credential storage and token issuance live in the identity service; this
/// table only carries what attendance needs to resolve openers and members.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Primary key ID (auto-incremented).
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique student/staff number.
    pub username: String,
    /// User's unique email address.
    pub email: String,
    /// Whether the user has admin privileges.
    pub admin: bool,
    /// Timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::class_membership::Entity")]
    Memberships,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    AttendanceRecords,
}

impl Related<super::class_membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DbConn,
        username: &str,
        email: &str,
        admin: bool,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let user = ActiveModel {
            username: Set(username.to_owned()),
            email: Set(email.to_owned()),
            admin: Set(admin),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        user.insert(db).await
    }
}
