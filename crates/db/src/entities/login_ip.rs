//! Login IP entity.
//!
//! One row per (user, origin IP). Rows start untrusted and only become
//! trusted when the owner marks them so.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A network origin a user has signed in from.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "login_ip")]
pub struct Model {
    /// Unique identifier.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owner. Unique together with `ip_address`.
    pub user_id: String,

    /// Observed origin address.
    pub ip_address: String,

    /// User agent seen on the first sighting that carried one.
    #[sea_orm(nullable)]
    pub device_info: Option<String>,

    /// Exempts this origin from new-login alerts.
    #[sea_orm(default_value = false)]
    pub is_trusted: bool,

    /// First sighting. Immutable.
    pub first_seen: DateTimeWithTimeZone,

    /// Most recent sighting.
    pub last_seen: DateTimeWithTimeZone,
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
