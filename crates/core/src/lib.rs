//! Core business logic for keyward.
//!
//! Sign-in address tracking with throttled security alerts, and the
//! field-level audit log of credential changes.

pub mod services;
pub mod testing;

pub use services::*;
