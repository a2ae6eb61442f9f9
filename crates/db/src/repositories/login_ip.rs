//! Login IP repository.

use std::sync::Arc;

use crate::entities::{LoginIp, login_ip};
use keyward_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use super::map_write_err;

/// Repository for the addresses each user has signed in from.
#[derive(Clone)]
pub struct LoginIpRepository {
    db: Arc<DatabaseConnection>,
}

impl LoginIpRepository {
    /// Create a new login IP repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the record for a `(user, address)` pair.
    pub async fn find_by_user_and_ip(
        &self,
        user_id: &str,
        ip_address: &str,
    ) -> AppResult<Option<login_ip::Model>> {
        LoginIp::find()
            .filter(login_ip::Column::UserId.eq(user_id))
            .filter(login_ip::Column::IpAddress.eq(ip_address))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a record by ID scoped to its owner.
    pub async fn find_by_id_and_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> AppResult<Option<login_ip::Model>> {
        LoginIp::find_by_id(id)
            .filter(login_ip::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List a user's addresses, most recently seen first.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Vec<login_ip::Model>> {
        LoginIp::find()
            .filter(login_ip::Column::UserId.eq(user_id))
            .order_by_desc(login_ip::Column::LastSeen)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new record.
    ///
    /// A concurrent insert of the same pair surfaces as [`AppError::Conflict`].
    pub async fn create(&self, model: login_ip::ActiveModel) -> AppResult<login_ip::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_write_err)
    }

    /// Update an existing record.
    pub async fn update(&self, model: login_ip::ActiveModel) -> AppResult<login_ip::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, Set};

    fn create_test_login_ip(id: &str, user_id: &str, ip: &str) -> login_ip::Model {
        let now = Utc::now();
        login_ip::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            ip_address: ip.to_string(),
            device_info: None,
            is_trusted: false,
            first_seen: now.into(),
            last_seen: now.into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_user_and_ip() {
        let record = create_test_login_ip("ip1", "user1", "10.0.0.1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[record]])
                .into_connection(),
        );

        let repo = LoginIpRepository::new(db);
        let found = repo.find_by_user_and_ip("user1", "10.0.0.1").await.unwrap();

        assert_eq!(found.unwrap().id, "ip1");
    }

    #[tokio::test]
    async fn test_find_by_id_and_user_other_owner() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<login_ip::Model>::new()])
                .into_connection(),
        );

        let repo = LoginIpRepository::new(db);
        let found = repo.find_by_id_and_user("ip1", "intruder").await.unwrap();

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_find_by_user_id() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_login_ip("ip2", "user1", "10.0.0.2"),
                    create_test_login_ip("ip1", "user1", "10.0.0.1"),
                ]])
                .into_connection(),
        );

        let repo = LoginIpRepository::new(db);
        let records = repo.find_by_user_id("user1").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ip_address, "10.0.0.2");
    }

    #[tokio::test]
    async fn test_create() {
        let record = create_test_login_ip("ip1", "user1", "10.0.0.1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[record.clone()]])
                .into_connection(),
        );

        let repo = LoginIpRepository::new(db);
        let model = login_ip::ActiveModel {
            id: Set(record.id.clone()),
            user_id: Set(record.user_id.clone()),
            ip_address: Set(record.ip_address.clone()),
            device_info: Set(None),
            is_trusted: Set(false),
            first_seen: Set(record.first_seen),
            last_seen: Set(record.last_seen),
        };

        let created = repo.create(model).await.unwrap();
        assert!(!created.is_trusted);
    }
}
