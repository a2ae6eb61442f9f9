//! Field-level change history for credentials.
//!
//! Entries are append-only. Values of sensitive fields are stored twice: the
//! plain columns carry [`REDACTED_PLACEHOLDER`] and the encrypted columns
//! carry the real value passed through the [`ValueCodec`] keyed by the owning
//! user id. Real values are only decoded for display after the account
//! password has been re-checked.

use chrono::{DateTime, Utc};
use keyward_common::{AppError, AppResult, IdGenerator};
use keyward_db::{
    entities::audit_entry::{self, ActionType},
    repositories::{AuditEntryRepository, UserRepository},
};
use sea_orm::Set;

use super::auth_gate::AuthGate;
use super::clock::SharedClock;
use super::codec::{CodecError, SharedCodec, ValueCodec};

/// Stored in the plain value columns of sensitive entries.
pub const REDACTED_PLACEHOLDER: &str = "********";

/// One change to record.
///
/// For sensitive entries the caller passes [`REDACTED_PLACEHOLDER`] in
/// `previous_value`/`new_value` and the real values in `actual_previous`/
/// `actual_new`. The plain values are stored as given.
#[derive(Debug, Clone)]
pub struct RecordAuditInput {
    /// Owner of the credential.
    pub user_id: String,
    /// Credential the change applies to. Kept after the credential is deleted.
    pub credential_id: String,
    /// Credential name at the time of the change.
    pub credential_name: String,
    /// Kind of change.
    pub action_type: ActionType,
    /// Attribute name for `Update` entries.
    pub field_changed: Option<String>,
    /// Plain value before the change, or the placeholder.
    pub previous_value: Option<String>,
    /// Plain value after the change, or the placeholder.
    pub new_value: Option<String>,
    /// Encode `actual_*` into the ciphertext columns.
    pub sensitive: bool,
    /// Real previous value of a sensitive field. Never stored in clear.
    pub actual_previous: Option<String>,
    /// Real new value of a sensitive field. Never stored in clear.
    pub actual_new: Option<String>,
}

impl RecordAuditInput {
    /// Entry for a whole-record action.
    #[must_use]
    pub fn record_action(
        user_id: &str,
        credential_id: &str,
        credential_name: &str,
        action_type: ActionType,
    ) -> Self {
        let name = Some(credential_name.to_string());
        let (previous_value, new_value) = match action_type {
            ActionType::Delete => (name, None),
            ActionType::Create | ActionType::Update => (None, name),
        };

        Self {
            user_id: user_id.to_string(),
            credential_id: credential_id.to_string(),
            credential_name: credential_name.to_string(),
            action_type,
            field_changed: None,
            previous_value,
            new_value,
            sensitive: false,
            actual_previous: None,
            actual_new: None,
        }
    }
}

/// Credential audit log.
#[derive(Clone)]
pub struct AuditService {
    audit_repo: AuditEntryRepository,
    user_repo: UserRepository,
    auth_gate: AuthGate,
    codec: SharedCodec,
    clock: SharedClock,
    page_size: u64,
    id_gen: IdGenerator,
}

impl AuditService {
    /// Create a new audit service.
    #[must_use]
    pub const fn new(
        audit_repo: AuditEntryRepository,
        user_repo: UserRepository,
        auth_gate: AuthGate,
        codec: SharedCodec,
        clock: SharedClock,
        page_size: u64,
    ) -> Self {
        Self {
            audit_repo,
            user_repo,
            auth_gate,
            codec,
            clock,
            page_size: if page_size == 0 { 1 } else { page_size },
            id_gen: IdGenerator::new(),
        }
    }

    /// Append one entry.
    pub async fn record(&self, input: RecordAuditInput) -> AppResult<audit_entry::Model> {
        self.user_repo.get_by_id(&input.user_id).await?;

        let model = build_entry(
            self.id_gen.generate(),
            input,
            self.codec.as_ref(),
            self.clock.now(),
        )
        .map_err(|e| AppError::Internal(e.to_string()))?;

        self.audit_repo.create(model).await
    }

    /// Newest entries first, sensitive values redacted.
    pub async fn list(&self, user_id: &str, limit: Option<u64>) -> AppResult<Vec<audit_entry::Model>> {
        let limit = limit.unwrap_or(self.page_size).clamp(1, self.page_size);
        self.audit_repo.find_by_user_id(user_id, limit).await
    }

    /// Newest entries first with sensitive values decoded.
    ///
    /// Fails with `InvalidCredentials` unless `password` is the account
    /// password. Decoding only touches the returned copies.
    pub async fn list_with_sensitive(
        &self,
        user_id: &str,
        password: &str,
    ) -> AppResult<Vec<audit_entry::Model>> {
        self.auth_gate.require(user_id, password).await?;

        let mut entries = self.audit_repo.find_by_user_id(user_id, self.page_size).await?;
        for entry in entries.iter_mut().filter(|e| e.contains_sensitive_data) {
            if let Err(e) = reveal(entry, self.codec.as_ref(), user_id) {
                tracing::warn!(
                    user_id = %user_id,
                    entry_id = %entry.id,
                    error = %e,
                    "Could not decode audit entry, leaving it redacted"
                );
            }
        }

        Ok(entries)
    }

    /// Delete all of a user's entries, or only one action type.
    pub async fn clear(&self, user_id: &str, action_type: Option<ActionType>) -> AppResult<u64> {
        self.user_repo.get_by_id(user_id).await?;

        let removed = self.audit_repo.delete_by_user(user_id, action_type).await?;
        tracing::info!(
            user_id = %user_id,
            action_type = action_type.map_or("all", ActionType::as_str),
            removed,
            "Audit history cleared"
        );
        Ok(removed)
    }
}

fn build_entry(
    id: String,
    input: RecordAuditInput,
    codec: &dyn ValueCodec,
    now: DateTime<Utc>,
) -> Result<audit_entry::ActiveModel, CodecError> {
    let (encrypted_previous_value, encrypted_new_value) = if input.sensitive {
        (
            codec.encrypt(input.actual_previous.as_deref(), &input.user_id)?,
            codec.encrypt(input.actual_new.as_deref(), &input.user_id)?,
        )
    } else {
        (None, None)
    };

    Ok(audit_entry::ActiveModel {
        id: Set(id),
        user_id: Set(input.user_id),
        credential_id: Set(input.credential_id),
        credential_name: Set(input.credential_name),
        action_type: Set(input.action_type),
        field_changed: Set(input.field_changed),
        previous_value: Set(input.previous_value),
        new_value: Set(input.new_value),
        encrypted_previous_value: Set(encrypted_previous_value),
        encrypted_new_value: Set(encrypted_new_value),
        contains_sensitive_data: Set(input.sensitive),
        created_at: Set(now.into()),
    })
}

/// Replace the placeholders of one entry with the decoded values.
fn reveal(entry: &mut audit_entry::Model, codec: &dyn ValueCodec, key: &str) -> Result<(), CodecError> {
    let previous = codec.decrypt(entry.encrypted_previous_value.as_deref(), key)?;
    let new = codec.decrypt(entry.encrypted_new_value.as_deref(), key)?;

    if previous.is_some() {
        entry.previous_value = previous;
    }
    if new.is_some() {
        entry.new_value = new;
    }
    Ok(())
}
