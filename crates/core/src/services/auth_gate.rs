//! Password re-verification gate.
//!
//! Guards revealing a stored secret, changing the account password and
//! reading decrypted audit history.

use keyward_common::{AppError, AppResult};
use keyward_db::{entities::user, repositories::UserRepository};

use super::password::verify_password;

/// Re-checks a user's account password.
#[derive(Clone)]
pub struct AuthGate {
    user_repo: UserRepository,
}

impl AuthGate {
    /// Create a new gate.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// Whether `candidate` matches the stored hash of `user_id`.
    pub async fn verify(&self, user_id: &str, candidate: &str) -> AppResult<bool> {
        let user = self.user_repo.get_by_id(user_id).await?;
        verify_password(candidate, &user.password_hash)
    }

    /// Like [`AuthGate::verify`], but a mismatch is an error.
    pub async fn require(&self, user_id: &str, candidate: &str) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(user_id).await?;

        if verify_password(candidate, &user.password_hash)? {
            Ok(user)
        } else {
            tracing::info!(user_id = %user_id, "Password re-verification failed");
            Err(AppError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::password::hash_password;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn user_with_password(password: &str) -> user::Model {
        user::Model {
            id: "user1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: hash_password(password).unwrap(),
            is_admin: false,
            pin_enabled: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn gate_with(users: Vec<user::Model>) -> AuthGate {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([users])
                .into_connection(),
        );
        AuthGate::new(UserRepository::new(db))
    }

    #[tokio::test]
    async fn test_verify_match() {
        let gate = gate_with(vec![user_with_password("correct horse")]);
        assert!(gate.verify("user1", "correct horse").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_mismatch() {
        let gate = gate_with(vec![user_with_password("correct horse")]);
        assert!(!gate.verify("user1", "battery staple").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_unknown_user() {
        let gate = gate_with(vec![]);
        let result = gate.verify("ghost", "anything").await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_require_mismatch_is_invalid_credentials() {
        let gate = gate_with(vec![user_with_password("correct horse")]);
        let result = gate.require("user1", "nope").await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }
}
