//! Credential change log entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of change recorded for a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Credential was created.
    #[sea_orm(string_value = "create")]
    Create,
    /// A single field of the credential changed.
    #[sea_orm(string_value = "update")]
    Update,
    /// Credential was removed.
    #[sea_orm(string_value = "delete")]
    Delete,
}

impl ActionType {
    /// Wire name of this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown action type: {other}")),
        }
    }
}

/// One observed change to a credential. Rows are never updated.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "password_log")]
pub struct Model {
    /// ULID.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owner.
    pub user_id: String,

    /// Affected credential. Not a foreign key so history outlives the item.
    pub credential_id: String,

    /// Credential name at the time of the action.
    pub credential_name: String,

    /// Kind of change.
    pub action_type: ActionType,

    /// Attribute that changed; absent for whole-record create/delete.
    #[sea_orm(nullable)]
    pub field_changed: Option<String>,

    /// Display value before the change. Redaction placeholder for sensitive fields.
    #[sea_orm(nullable)]
    pub previous_value: Option<String>,

    /// Display value after the change. Redaction placeholder for sensitive fields.
    #[sea_orm(nullable)]
    pub new_value: Option<String>,

    /// Encoded real value before the change. Only set for sensitive fields.
    #[sea_orm(nullable)]
    pub encrypted_previous_value: Option<String>,

    /// Encoded real value after the change. Only set for sensitive fields.
    #[sea_orm(nullable)]
    pub encrypted_new_value: Option<String>,

    /// Whether the encoded columns hold the real values.
    #[sea_orm(default_value = false)]
    pub contains_sensitive_data: bool,

    /// Creation time, used for reverse-chronological listing.
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
