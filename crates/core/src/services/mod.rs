//! Business logic services.

#![allow(missing_docs)]

pub mod audit;
pub mod auth;
pub mod auth_gate;
pub mod background;
pub mod clock;
pub mod codec;
pub mod credential;
pub mod login_ip;
pub mod login_monitor;
pub mod mailer;
pub mod password;
pub mod security_alert;
pub mod throttle;

pub use audit::{AuditService, REDACTED_PLACEHOLDER, RecordAuditInput};
pub use auth::{AuthService, ChangePasswordInput, IssuedSession, SessionClaims};
pub use auth_gate::AuthGate;
pub use background::{BackgroundTasks, TaskFailureReporter, TracingFailureReporter};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use codec::{CodecError, SharedCodec, ValueCodec, XorHexCodec};
pub use credential::{
    CreateCredentialInput, CredentialService, FIELD_DESCRIPTORS, FieldChange, FieldDescriptor,
    UpdateCredentialInput, diff_fields, yes_no,
};
pub use login_ip::{LoginIpService, RecordLoginOutcome};
pub use login_monitor::{LoginMonitor, LoginTrackOutcome};
pub use mailer::{LogMailSender, MailError, MailSender, SharedMailSender, SmtpMailSender};
pub use password::{hash_password, verify_password};
pub use security_alert::{SecurityAlertService, UNKNOWN_DEVICE};
pub use throttle::NotificationThrottle;
