//! Reaction entity (a user's like on a post, recording, beat or comment).
//!
//! Reactions are polymorphic: `(target_kind, target_id)` points into one of
//! the content tables. The unique index on `(user_id, target_kind, target_id)`
//! is what guarantees at most one like per user per item, including under
//! concurrent inserts.

use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kinds of content that can be liked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[sea_orm(string_value = "post")]
    Post,
    #[sea_orm(string_value = "recording")]
    Recording,
    #[sea_orm(string_value = "beat")]
    Beat,
    #[sea_orm(string_value = "comment")]
    Comment,
}

impl ContentKind {
    /// Singular name, as stored in `reaction.target_kind`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Recording => "recording",
            Self::Beat => "beat",
            Self::Comment => "comment",
        }
    }

    /// Table holding entities of this kind.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        self.as_str()
    }

    /// Whether entities of this kind carry a `comments_count` column.
    #[must_use]
    pub const fn has_comments(self) -> bool {
        matches!(self, Self::Post | Self::Recording)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    /// Accepts both singular and plural forms (`post`, `posts`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" | "posts" => Ok(Self::Post),
            "recording" | "recordings" => Ok(Self::Recording),
            "beat" | "beats" => Ok(Self::Beat),
            "comment" | "comments" => Ok(Self::Comment),
            other => Err(format!("unknown content kind: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reaction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who liked
    pub user_id: String,

    pub target_kind: ContentKind,

    pub target_id: String,

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
