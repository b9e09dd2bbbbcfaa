use sea_orm::EntityTrait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The user-class-role relationship table.
///
/// A row means the user belongs to the class in the given role; the
/// attendance subsystem only distinguishes lecturers (session openers)
/// from students (joining members).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "class_memberships")]
pub struct Model {
    /// User ID (foreign key to `users`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    /// Class ID (foreign key to `classes`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub class_id: i64,

    /// Role type: Lecturer or Student
    pub role: Role,
}

/// Enum representing user roles within a class.
#[derive(
    Debug, Clone, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "lecturer")]
    Lecturer,

    #[sea_orm(string_value = "student")]
    Student,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id"
    )]
    Class,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Enrolls a user in a class with the given role.
    pub async fn assign_user_to_class(
        db: &DbConn,
        user_id: i64,
        class_id: i64,
        role: Role,
    ) -> Result<Self, DbErr> {
        let membership = ActiveModel {
            user_id: Set(user_id),
            class_id: Set(class_id),
            role: Set(role),
        };
        membership.insert(db).await
    }

    /// Whether the user holds `role` in the class.
    pub async fn has_role(
        db: &DbConn,
        user_id: i64,
        class_id: i64,
        role: Role,
    ) -> Result<bool, DbErr> {
        let found = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::ClassId.eq(class_id))
            .filter(Column::Role.eq(role))
            .one(db)
            .await?;
        Ok(found.is_some())
    }

    /// All student memberships of a class, for reporting.
    pub async fn students_of_class(db: &DbConn, class_id: i64) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::ClassId.eq(class_id))
            .filter(Column::Role.eq(Role::Student))
            .all(db)
            .await
    }
}
