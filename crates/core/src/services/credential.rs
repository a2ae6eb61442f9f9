//! Stored credentials and the audit trail of their changes.
//!
//! Which attributes are audited, and how, is declared once in
//! [`FIELD_DESCRIPTORS`]. Updates diff the stored row against the edited
//! one through that table and log one entry per changed attribute.

use chrono::Utc;
use keyward_common::{AppError, AppResult, IdGenerator};
use keyward_db::{
    entities::{
        audit_entry::{self, ActionType},
        credential,
    },
    repositories::CredentialRepository,
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::audit::{AuditService, REDACTED_PLACEHOLDER, RecordAuditInput};
use super::auth_gate::AuthGate;

/// How one credential attribute appears in the audit log.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Value of `field_changed` for this attribute.
    pub name: &'static str,
    /// Real values only go to the encrypted columns.
    pub sensitive: bool,
    read: fn(&credential::Model) -> Option<String>,
}

impl FieldDescriptor {
    /// Display value of this attribute on `model`.
    #[must_use]
    pub fn read(&self, model: &credential::Model) -> Option<String> {
        (self.read)(model)
    }
}

fn read_name(m: &credential::Model) -> Option<String> {
    Some(m.name.clone())
}

fn read_login(m: &credential::Model) -> Option<String> {
    m.login.clone()
}

fn read_secret(m: &credential::Model) -> Option<String> {
    Some(m.secret.clone())
}

fn read_favorite(m: &credential::Model) -> Option<String> {
    Some(yes_no(m.favorite).to_string())
}

/// Audited credential attributes.
pub const FIELD_DESCRIPTORS: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "name",
        sensitive: false,
        read: read_name,
    },
    FieldDescriptor {
        name: "login",
        sensitive: false,
        read: read_login,
    },
    FieldDescriptor {
        name: "password",
        sensitive: true,
        read: read_secret,
    },
    FieldDescriptor {
        name: "favorite",
        sensitive: false,
        read: read_favorite,
    },
];

/// Boolean rendering used in audit values.
#[must_use]
pub const fn yes_no(value: bool) -> &'static str {
    if value { "Sim" } else { "Não" }
}

/// One attribute whose value differs between two versions of a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    /// Descriptor name, e.g. `password`.
    pub field: &'static str,
    /// Copied from the descriptor.
    pub sensitive: bool,
    /// Rendered value before the edit.
    pub previous: Option<String>,
    /// Rendered value after the edit.
    pub new: Option<String>,
}

impl FieldChange {
    /// Audit input for this change, redacting sensitive values.
    #[must_use]
    pub fn into_audit_input(self, after: &credential::Model) -> RecordAuditInput {
        let (previous_value, new_value, actual_previous, actual_new) = if self.sensitive {
            (
                self.previous.as_ref().map(|_| REDACTED_PLACEHOLDER.to_string()),
                self.new.as_ref().map(|_| REDACTED_PLACEHOLDER.to_string()),
                self.previous,
                self.new,
            )
        } else {
            (self.previous, self.new, None, None)
        };

        RecordAuditInput {
            user_id: after.user_id.clone(),
            credential_id: after.id.clone(),
            credential_name: after.name.clone(),
            action_type: ActionType::Update,
            field_changed: Some(self.field.to_string()),
            previous_value,
            new_value,
            sensitive: self.sensitive,
            actual_previous,
            actual_new,
        }
    }
}

/// Changed attributes between `before` and `after`, in descriptor order.
#[must_use]
pub fn diff_fields(before: &credential::Model, after: &credential::Model) -> Vec<FieldChange> {
    FIELD_DESCRIPTORS
        .iter()
        .filter_map(|descriptor| {
            let previous = descriptor.read(before);
            let new = descriptor.read(after);
            (previous != new).then_some(FieldChange {
                field: descriptor.name,
                sensitive: descriptor.sensitive,
                previous,
                new,
            })
        })
        .collect()
}

/// Input for creating a credential.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCredentialInput {
    /// Label shown in lists.
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Username on the target site. Empty means none.
    #[validate(length(max = 255))]
    pub login: Option<String>,

    /// The secret to store.
    #[validate(length(min = 1, max = 4096))]
    pub password: String,

    /// Pinned.
    #[serde(default)]
    pub favorite: bool,
}

/// Input for updating a credential. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCredentialInput {
    /// New label.
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    /// An empty string clears the login.
    #[validate(length(max = 255))]
    pub login: Option<String>,

    /// New secret. Logged redacted.
    #[validate(length(min = 1, max = 4096))]
    pub password: Option<String>,

    /// New pin state.
    pub favorite: Option<bool>,
}

/// Credential service.
#[derive(Clone)]
pub struct CredentialService {
    credential_repo: CredentialRepository,
    audit: AuditService,
    auth_gate: AuthGate,
    id_gen: IdGenerator,
}

impl CredentialService {
    /// Create a new credential service.
    #[must_use]
    pub const fn new(
        credential_repo: CredentialRepository,
        audit: AuditService,
        auth_gate: AuthGate,
    ) -> Self {
        Self {
            credential_repo,
            audit,
            auth_gate,
            id_gen: IdGenerator::new(),
        }
    }

    /// Store a new credential.
    pub async fn create(
        &self,
        user_id: &str,
        input: CreateCredentialInput,
    ) -> AppResult<credential::Model> {
        input.validate()?;

        let model = credential::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            name: Set(input.name),
            login: Set(input.login.filter(|l| !l.is_empty())),
            secret: Set(input.password),
            favorite: Set(input.favorite),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        let created = self.credential_repo.create(model).await?;

        self.log(RecordAuditInput::record_action(
            user_id,
            &created.id,
            &created.name,
            ActionType::Create,
        ))
        .await;

        Ok(created)
    }

    /// Apply an edit and log one entry per changed attribute.
    pub async fn update(
        &self,
        user_id: &str,
        credential_id: &str,
        input: UpdateCredentialInput,
    ) -> AppResult<credential::Model> {
        input.validate()?;

        let before = self
            .credential_repo
            .get_by_id_and_user(credential_id, user_id)
            .await?;

        let mut edited = before.clone();
        if let Some(name) = input.name {
            edited.name = name;
        }
        if let Some(login) = input.login {
            edited.login = Some(login).filter(|l| !l.is_empty());
        }
        if let Some(password) = input.password {
            edited.secret = password;
        }
        if let Some(favorite) = input.favorite {
            edited.favorite = favorite;
        }

        let changes = diff_fields(&before, &edited);
        if changes.is_empty() {
            return Ok(before);
        }

        let mut active: credential::ActiveModel = before.into();
        active.name = Set(edited.name);
        active.login = Set(edited.login);
        active.secret = Set(edited.secret);
        active.favorite = Set(edited.favorite);
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = self.credential_repo.update(active).await?;

        self.log_changes(changes, &updated).await;

        Ok(updated)
    }

    /// Remove a credential. Its history stays.
    pub async fn delete(&self, user_id: &str, credential_id: &str) -> AppResult<()> {
        let existing = self
            .credential_repo
            .get_by_id_and_user(credential_id, user_id)
            .await?;

        self.credential_repo.delete(&existing.id).await?;

        self.log(RecordAuditInput::record_action(
            user_id,
            &existing.id,
            &existing.name,
            ActionType::Delete,
        ))
        .await;

        Ok(())
    }

    /// A user's credentials, newest first.
    pub async fn list(
        &self,
        user_id: &str,
        favorite: Option<bool>,
    ) -> AppResult<Vec<credential::Model>> {
        self.credential_repo.find_by_user_id(user_id, favorite).await
    }

    /// One credential owned by `user_id`.
    pub async fn get(&self, user_id: &str, credential_id: &str) -> AppResult<credential::Model> {
        self.credential_repo
            .get_by_id_and_user(credential_id, user_id)
            .await
    }

    /// Disclose the stored secret after re-checking the account password.
    pub async fn reveal(
        &self,
        user_id: &str,
        credential_id: &str,
        password: &str,
    ) -> AppResult<String> {
        self.auth_gate.require(user_id, password).await?;

        let credential = self
            .credential_repo
            .get_by_id_and_user(credential_id, user_id)
            .await?;
        Ok(credential.secret)
    }

    async fn log_changes(
        &self,
        changes: Vec<FieldChange>,
        after: &credential::Model,
    ) -> Vec<audit_entry::Model> {
        let mut recorded = Vec::with_capacity(changes.len());
        for change in changes {
            if let Some(entry) = self.log(change.into_audit_input(after)).await {
                recorded.push(entry);
            }
        }
        recorded
    }

    /// History is best effort: a failed write is logged, the mutation stands.
    async fn log(&self, input: RecordAuditInput) -> Option<audit_entry::Model> {
        let credential_id = input.credential_id.clone();
        match self.audit.record(input).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::error!(
                    credential_id = %credential_id,
                    error = %e,
                    "Failed to write audit entry"
                );
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::{ManualClock, ValueCodec, XorHexCodec, hash_password};
    use keyward_db::entities::user;
    use keyward_db::repositories::{AuditEntryRepository, UserRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn test_credential() -> credential::Model {
        credential::Model {
            id: "cred1".to_string(),
            user_id: "user1".to_string(),
            name: "Mail".to_string(),
            login: Some("ana@example.com".to_string()),
            secret: "old123".to_string(),
            favorite: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_user() -> user::Model {
        user::Model {
            id: "user1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: hash_password("account-pass").unwrap(),
            is_admin: false,
            pin_enabled: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_entry(field: &str) -> audit_entry::Model {
        audit_entry::Model {
            id: format!("entry-{field}"),
            user_id: "user1".to_string(),
            credential_id: "cred1".to_string(),
            credential_name: "Webmail".to_string(),
            action_type: ActionType::Update,
            field_changed: Some(field.to_string()),
            previous_value: None,
            new_value: None,
            encrypted_previous_value: None,
            encrypted_new_value: None,
            contains_sensitive_data: field == "password",
            created_at: Utc::now().into(),
        }
    }

    fn service(db: MockDatabase) -> CredentialService {
        let db = Arc::new(db.into_connection());
        let user_repo = UserRepository::new(db.clone());
        let gate = AuthGate::new(user_repo.clone());
        let audit = AuditService::new(
            AuditEntryRepository::new(db.clone()),
            user_repo,
            gate.clone(),
            Arc::new(XorHexCodec),
            Arc::new(ManualClock::new(Utc::now())),
            50,
        );
        CredentialService::new(CredentialRepository::new(db), audit, gate)
    }

    #[test]
    fn test_diff_name_and_password() {
        let before = test_credential();
        let mut after = before.clone();
        after.name = "Webmail".to_string();
        after.secret = "new456".to_string();

        let changes = diff_fields(&before, &after);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field, "name");
        assert!(!changes[0].sensitive);
        assert_eq!(changes[1].field, "password");
        assert!(changes[1].sensitive);
    }

    #[test]
    fn test_diff_same_value_is_no_change() {
        let before = test_credential();
        let mut after = before.clone();
        after.secret = "old123".to_string();
        after.favorite = false;

        assert!(diff_fields(&before, &after).is_empty());
    }

    #[test]
    fn test_diff_favorite_renders_sim_nao() {
        let before = test_credential();
        let mut after = before.clone();
        after.favorite = true;

        let changes = diff_fields(&before, &after);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous.as_deref(), Some("Não"));
        assert_eq!(changes[0].new.as_deref(), Some("Sim"));
    }

    #[test]
    fn test_diff_login_cleared() {
        let before = test_credential();
        let mut after = before.clone();
        after.login = None;

        let changes = diff_fields(&before, &after);

        assert_eq!(changes[0].field, "login");
        assert_eq!(changes[0].new, None);
    }

    #[test]
    fn test_password_change_is_redacted() {
        let before = test_credential();
        let mut after = before.clone();
        after.secret = "new456".to_string();

        let change = diff_fields(&before, &after).remove(0);
        let input = change.into_audit_input(&after);

        assert_eq!(input.field_changed.as_deref(), Some("password"));
        assert!(input.sensitive);
        assert_eq!(input.previous_value.as_deref(), Some(REDACTED_PLACEHOLDER));
        assert_eq!(input.new_value.as_deref(), Some(REDACTED_PLACEHOLDER));
        assert_eq!(input.actual_previous.as_deref(), Some("old123"));
        assert_eq!(input.actual_new.as_deref(), Some("new456"));
        assert_eq!(
            XorHexCodec
                .encrypt(input.actual_previous.as_deref(), &input.user_id)
                .unwrap(),
            XorHexCodec.encrypt(Some("old123"), "user1").unwrap()
        );
    }

    #[test]
    fn test_every_sensitive_descriptor_is_redacted() {
        let before = test_credential();
        let mut after = before.clone();
        after.name = "Webmail".to_string();
        after.login = Some("other@example.com".to_string());
        after.secret = "new456".to_string();
        after.favorite = true;

        let changes = diff_fields(&before, &after);
        assert_eq!(changes.len(), FIELD_DESCRIPTORS.len());

        for change in changes {
            let input = change.into_audit_input(&after);
            if input.sensitive {
                assert_eq!(input.previous_value.as_deref(), Some(REDACTED_PLACEHOLDER));
                assert_eq!(input.new_value.as_deref(), Some(REDACTED_PLACEHOLDER));
            } else {
                assert_ne!(input.new_value.as_deref(), Some(REDACTED_PLACEHOLDER));
            }
        }
    }

    #[tokio::test]
    async fn test_log_changes_writes_one_entry_per_field() {
        let before = test_credential();
        let mut after = before.clone();
        after.name = "Webmail".to_string();
        after.secret = "new456".to_string();

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user()]])
                .append_query_results([[test_entry("name")]])
                .append_query_results([[test_user()]])
                .append_query_results([[test_entry("password")]]),
        );

        let entries = service
            .log_changes(diff_fields(&before, &after), &after)
            .await;

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].field_changed.as_deref(), Some("name"));
        assert_eq!(entries[1].field_changed.as_deref(), Some("password"));
    }

    #[tokio::test]
    async fn test_update_without_changes_skips_writes() {
        // only the lookup is answered; any write would hit an empty mock
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_credential()]]),
        );

        let input = UpdateCredentialInput {
            password: Some("old123".to_string()),
            ..Default::default()
        };
        let result = service.update("user1", "cred1", input).await.unwrap();

        assert_eq!(result.secret, "old123");
    }

    #[tokio::test]
    async fn test_update_survives_audit_failure() {
        let mut updated = test_credential();
        updated.secret = "new456".to_string();

        // lookup and update answered; the audit user lookup finds nothing
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_credential()]])
                .append_query_results([[updated]])
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let input = UpdateCredentialInput {
            password: Some("new456".to_string()),
            ..Default::default()
        };
        let result = service.update("user1", "cred1", input).await.unwrap();

        assert_eq!(result.secret, "new456");
    }

    #[tokio::test]
    async fn test_update_rejects_empty_name() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let input = UpdateCredentialInput {
            name: Some(String::new()),
            ..Default::default()
        };
        let result = service.update("user1", "cred1", input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_not_owned() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<credential::Model>::new()]),
        );

        let result = service.delete("intruder", "cred1").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_logs_name() {
        let mut entry = test_entry("name");
        entry.action_type = ActionType::Delete;
        entry.field_changed = None;

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_credential()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[test_user()]])
                .append_query_results([[entry]]),
        );

        assert!(service.delete("user1", "cred1").await.is_ok());
    }

    #[tokio::test]
    async fn test_reveal_requires_password() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user()]]),
        );

        let result = service.reveal("user1", "cred1", "wrong").await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_reveal() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user()]])
                .append_query_results([[test_credential()]]),
        );

        let secret = service.reveal("user1", "cred1", "account-pass").await.unwrap();

        assert_eq!(secret, "old123");
    }
}
