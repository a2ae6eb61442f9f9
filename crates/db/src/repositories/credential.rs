//! Credential repository.

use std::sync::Arc;

use crate::entities::{Credential, credential};
use keyward_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Credential repository for database operations.
#[derive(Clone)]
pub struct CredentialRepository {
    db: Arc<DatabaseConnection>,
}

impl CredentialRepository {
    /// Create a new credential repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a credential by ID scoped to its owner.
    pub async fn find_by_id_and_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> AppResult<Option<credential::Model>> {
        Credential::find_by_id(id)
            .filter(credential::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a credential owned by `user_id`, returning an error if not found.
    pub async fn get_by_id_and_user(&self, id: &str, user_id: &str) -> AppResult<credential::Model> {
        self.find_by_id_and_user(id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Credential: {id}")))
    }

    /// List a user's credentials, newest first, optionally only favorites.
    pub async fn find_by_user_id(
        &self,
        user_id: &str,
        favorite: Option<bool>,
    ) -> AppResult<Vec<credential::Model>> {
        let mut query = Credential::find().filter(credential::Column::UserId.eq(user_id));

        if let Some(favorite) = favorite {
            query = query.filter(credential::Column::Favorite.eq(favorite));
        }

        query
            .order_by_desc(credential::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new credential.
    pub async fn create(&self, model: credential::ActiveModel) -> AppResult<credential::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a credential.
    pub async fn update(&self, model: credential::ActiveModel) -> AppResult<credential::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a credential.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Credential::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
