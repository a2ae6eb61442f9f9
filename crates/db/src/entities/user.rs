//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    /// ULID.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Display name
    pub name: String,

    /// Login and notification address
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2 PHC string.
    pub password_hash: String,

    /// Administrator account.
    #[sea_orm(default_value = false)]
    pub is_admin: bool,

    /// Device PIN unlock is enabled on the client. The server never
    /// accepts a PIN in place of the password.
    #[sea_orm(default_value = false)]
    pub pin_enabled: bool,

    /// Registration time.
    pub created_at: DateTimeWithTimeZone,

    /// Last profile or password change.
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::credential::Entity")]
    Credentials,

    #[sea_orm(has_many = "super::login_ip::Entity")]
    LoginIps,

    #[sea_orm(has_many = "super::audit_entry::Entity")]
    AuditEntries,
}

impl Related<super::credential::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Credentials.def()
    }
}

impl Related<super::login_ip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoginIps.def()
    }
}

impl Related<super::audit_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuditEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
