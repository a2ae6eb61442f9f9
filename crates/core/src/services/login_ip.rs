//! Per-user record of sign-in addresses and their trust state.

use chrono::{DateTime, Utc};
use keyward_common::{AppError, AppResult, IdGenerator};
use keyward_db::{
    entities::login_ip,
    repositories::{LoginIpRepository, UserRepository},
};
use sea_orm::Set;

use super::clock::SharedClock;

/// Result of recording one sign-in.
#[derive(Debug, Clone)]
pub struct RecordLoginOutcome {
    /// `true` when this was the first sign-in from the address.
    pub is_new_ip: bool,
    /// Stored record after the write.
    pub record: login_ip::Model,
}

/// Tracks which addresses each user signs in from.
#[derive(Clone)]
pub struct LoginIpService {
    login_ip_repo: LoginIpRepository,
    user_repo: UserRepository,
    clock: SharedClock,
    id_gen: IdGenerator,
}

impl LoginIpService {
    /// Create a new login IP service.
    #[must_use]
    pub const fn new(
        login_ip_repo: LoginIpRepository,
        user_repo: UserRepository,
        clock: SharedClock,
    ) -> Self {
        Self {
            login_ip_repo,
            user_repo,
            clock,
            id_gen: IdGenerator::new(),
        }
    }

    /// Record a sign-in from `ip_address`.
    ///
    /// A first sighting creates an untrusted record. Later sightings move
    /// `last_seen` and fill `device_info` only if it was never set.
    pub async fn record_login(
        &self,
        user_id: &str,
        ip_address: &str,
        device_info: Option<&str>,
    ) -> AppResult<RecordLoginOutcome> {
        self.user_repo.get_by_id(user_id).await?;
        let now = self.clock.now();

        if let Some(existing) = self
            .login_ip_repo
            .find_by_user_and_ip(user_id, ip_address)
            .await?
        {
            let record = self
                .login_ip_repo
                .update(sighting(existing, device_info, now))
                .await?;
            return Ok(RecordLoginOutcome {
                is_new_ip: false,
                record,
            });
        }

        let model = first_sighting(self.id_gen.generate(), user_id, ip_address, device_info, now);
        match self.login_ip_repo.create(model).await {
            Ok(record) => {
                tracing::info!(user_id = %user_id, ip = %ip_address, "New sign-in address recorded");
                Ok(RecordLoginOutcome {
                    is_new_ip: true,
                    record,
                })
            }
            // A concurrent sign-in from the same address inserted first.
            Err(AppError::Conflict(_)) => {
                let existing = self
                    .login_ip_repo
                    .find_by_user_and_ip(user_id, ip_address)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("LoginIp: {ip_address}")))?;
                let record = self
                    .login_ip_repo
                    .update(sighting(existing, device_info, now))
                    .await?;
                Ok(RecordLoginOutcome {
                    is_new_ip: false,
                    record,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// List a user's addresses, most recently seen first.
    pub async fn list(&self, user_id: &str) -> AppResult<Vec<login_ip::Model>> {
        self.login_ip_repo.find_by_user_id(user_id).await
    }

    /// Mark an address trusted or untrusted.
    pub async fn set_trust(
        &self,
        user_id: &str,
        login_ip_id: &str,
        is_trusted: bool,
    ) -> AppResult<login_ip::Model> {
        let record = self
            .login_ip_repo
            .find_by_id_and_user(login_ip_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("LoginIp: {login_ip_id}")))?;

        let mut active: login_ip::ActiveModel = record.into();
        active.is_trusted = Set(is_trusted);
        let updated = self.login_ip_repo.update(active).await?;

        tracing::info!(
            user_id = %user_id,
            login_ip_id = %login_ip_id,
            is_trusted,
            "Sign-in address trust updated"
        );
        Ok(updated)
    }
}

fn first_sighting(
    id: String,
    user_id: &str,
    ip_address: &str,
    device_info: Option<&str>,
    now: DateTime<Utc>,
) -> login_ip::ActiveModel {
    login_ip::ActiveModel {
        id: Set(id),
        user_id: Set(user_id.to_string()),
        ip_address: Set(ip_address.to_string()),
        device_info: Set(non_empty(device_info)),
        is_trusted: Set(false),
        first_seen: Set(now.into()),
        last_seen: Set(now.into()),
    }
}

fn sighting(
    existing: login_ip::Model,
    device_info: Option<&str>,
    now: DateTime<Utc>,
) -> login_ip::ActiveModel {
    let fill_device = existing.device_info.is_none();
    let mut active: login_ip::ActiveModel = existing.into();

    active.last_seen = Set(now.into());
    if fill_device {
        if let Some(device) = non_empty(device_info) {
            active.device_info = Set(Some(device));
        }
    }

    active
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use chrono::TimeDelta;
    use keyward_db::entities::user;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn test_user() -> user::Model {
        user::Model {
            id: "user1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: String::new(),
            is_admin: false,
            pin_enabled: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_record(device_info: Option<&str>, at: DateTime<Utc>) -> login_ip::Model {
        login_ip::Model {
            id: "ip1".to_string(),
            user_id: "user1".to_string(),
            ip_address: "1.2.3.4".to_string(),
            device_info: device_info.map(ToString::to_string),
            is_trusted: false,
            first_seen: at.into(),
            last_seen: at.into(),
        }
    }

    fn service(db: DatabaseConnection) -> LoginIpService {
        let db = Arc::new(db);
        LoginIpService::new(
            LoginIpRepository::new(db.clone()),
            UserRepository::new(db),
            Arc::new(ManualClock::new(Utc::now())),
        )
    }

    #[test]
    fn test_first_sighting_is_untrusted() {
        let now = Utc::now();
        let active = first_sighting("ip1".to_string(), "user1", "1.2.3.4", Some("Firefox"), now);

        assert!(!active.is_trusted.clone().unwrap());
        assert_eq!(active.first_seen.clone().unwrap(), active.last_seen.clone().unwrap());
        assert_eq!(active.device_info.clone().unwrap().as_deref(), Some("Firefox"));
    }

    #[test]
    fn test_sighting_keeps_first_seen() {
        let start = Utc::now();
        let later = start + TimeDelta::minutes(5);

        let active = sighting(test_record(None, start), None, later);

        assert!(!active.first_seen.is_set());
        assert_eq!(active.last_seen.clone().unwrap(), later);
    }

    #[test]
    fn test_sighting_never_overwrites_device() {
        let now = Utc::now();

        let active = sighting(test_record(Some("Firefox"), now), Some("Chrome"), now);

        assert!(!active.device_info.is_set());
        assert_eq!(active.device_info.clone().unwrap().as_deref(), Some("Firefox"));
    }

    #[test]
    fn test_sighting_fills_missing_device() {
        let now = Utc::now();

        let active = sighting(test_record(None, now), Some("Chrome"), now);

        assert_eq!(active.device_info.clone().unwrap().as_deref(), Some("Chrome"));

        let blank = sighting(test_record(None, now), Some("   "), now);
        assert!(!blank.device_info.is_set());
    }

    #[tokio::test]
    async fn test_record_login_new_ip() {
        let now = Utc::now();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user()]])
            .append_query_results([Vec::<login_ip::Model>::new()])
            .append_query_results([[test_record(Some("Firefox"), now)]])
            .into_connection();

        let outcome = service(db)
            .record_login("user1", "1.2.3.4", Some("Firefox"))
            .await
            .unwrap();

        assert!(outcome.is_new_ip);
        assert!(!outcome.record.is_trusted);
    }

    #[tokio::test]
    async fn test_record_login_known_ip() {
        let start = Utc::now();
        let mut updated = test_record(Some("Firefox"), start);
        updated.last_seen = (start + TimeDelta::seconds(3)).into();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user()]])
            .append_query_results([[test_record(Some("Firefox"), start)]])
            .append_query_results([[updated]])
            .into_connection();

        let outcome = service(db)
            .record_login("user1", "1.2.3.4", Some("Chrome"))
            .await
            .unwrap();

        assert!(!outcome.is_new_ip);
        assert_eq!(outcome.record.first_seen, start);
        assert!(outcome.record.last_seen > outcome.record.first_seen);
    }

    #[tokio::test]
    async fn test_record_login_unknown_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let result = service(db).record_login("ghost", "1.2.3.4", None).await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_set_trust_not_owned() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<login_ip::Model>::new()])
            .into_connection();

        let result = service(db).set_trust("intruder", "ip1", true).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_trust() {
        let now = Utc::now();
        let mut trusted = test_record(None, now);
        trusted.is_trusted = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_record(None, now)]])
            .append_query_results([[trusted]])
            .into_connection();

        let record = service(db).set_trust("user1", "ip1", true).await.unwrap();

        assert!(record.is_trusted);
    }
}
