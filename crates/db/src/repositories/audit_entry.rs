//! Credential audit log repository.

use std::sync::Arc;

use crate::entities::{AuditEntry, audit_entry};
use audit_entry::ActionType;
use keyward_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Number of entries returned by a history listing when no limit is given.
pub const DEFAULT_AUDIT_PAGE_SIZE: u64 = 50;

/// Repository for credential change history.
#[derive(Clone)]
pub struct AuditEntryRepository {
    db: Arc<DatabaseConnection>,
}

impl AuditEntryRepository {
    /// Create a new audit entry repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append an entry.
    pub async fn create(&self, model: audit_entry::ActiveModel) -> AppResult<audit_entry::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List a user's entries, newest first.
    pub async fn find_by_user_id(
        &self,
        user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<audit_entry::Model>> {
        AuditEntry::find()
            .filter(audit_entry::Column::UserId.eq(user_id))
            .order_by_desc(audit_entry::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a user's entries, optionally only those of one action type.
    ///
    /// Returns the number of rows removed.
    pub async fn delete_by_user(
        &self,
        user_id: &str,
        action_type: Option<ActionType>,
    ) -> AppResult<u64> {
        let mut query = AuditEntry::delete_many().filter(audit_entry::Column::UserId.eq(user_id));

        if let Some(action_type) = action_type {
            query = query.filter(audit_entry::Column::ActionType.eq(action_type));
        }

        let result = query
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
