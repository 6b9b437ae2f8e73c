//! Beat entity (uploaded instrumental).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "beat")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Uploader
    #[sea_orm(indexed)]
    pub user_id: String,

    pub title: String,

    /// Tempo, if the uploader supplied one
    #[sea_orm(nullable)]
    pub bpm: Option<i32>,

    /// Object-store key of the audio file
    pub storage_key: String,

    pub url: String,

    pub content_type: String,

    /// File size in bytes
    pub size: i64,

    /// Likes count (denormalized)
    #[sea_orm(default_value = 0)]
    pub likes_count: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
