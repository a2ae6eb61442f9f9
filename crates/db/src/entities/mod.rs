//! Database entities.

pub mod audit_entry;
pub mod credential;
pub mod login_ip;
pub mod user;

pub use audit_entry::Entity as AuditEntry;
pub use credential::Entity as Credential;
pub use login_ip::Entity as LoginIp;
pub use user::Entity as User;
