//! Credential (vault item) entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A stored credential owned by a user.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credential")]
pub struct Model {
    /// Unique identifier.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owner.
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Display name (site or service).
    pub name: String,

    /// Account identifier used on the site (email, username).
    #[sea_orm(nullable)]
    pub login: Option<String>,

    /// The stored secret. Only disclosed through an explicit reveal.
    #[sea_orm(column_type = "Text")]
    pub secret: String,

    /// Pinned by the user.
    #[sea_orm(default_value = false)]
    pub favorite: bool,

    /// When this credential was created.
    pub created_at: DateTimeWithTimeZone,

    /// When this credential was last changed.
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
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
