//! Repositories wrapping entity access.

mod audit_entry;
mod credential;
mod login_ip;
mod user;

pub use audit_entry::{AuditEntryRepository, DEFAULT_AUDIT_PAGE_SIZE};
pub use credential::CredentialRepository;
pub use login_ip::LoginIpRepository;
pub use user::UserRepository;

use keyward_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Map a database error, keeping unique-constraint collisions distinguishable.
pub(crate) fn map_write_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::Conflict(detail),
        _ => AppError::Database(err.to_string()),
    }
}
