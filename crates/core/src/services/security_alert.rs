//! Security alert mail for sign-ins from unrecognized addresses.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use keyward_db::entities::user;

use super::clock::SharedClock;
use super::mailer::SharedMailSender;
use super::throttle::NotificationThrottle;

/// Shown when the client sent no usable user agent.
pub const UNKNOWN_DEVICE: &str = "Unknown device";

/// Sends at most one alert per `(user, ip)` per throttle window.
#[derive(Clone)]
pub struct SecurityAlertService {
    throttle: NotificationThrottle,
    mailer: SharedMailSender,
    clock: SharedClock,
    timezone: Tz,
    app_name: String,
}

impl SecurityAlertService {
    /// Create a new alert service.
    #[must_use]
    pub const fn new(
        throttle: NotificationThrottle,
        mailer: SharedMailSender,
        clock: SharedClock,
        timezone: Tz,
        app_name: String,
    ) -> Self {
        Self {
            throttle,
            mailer,
            clock,
            timezone,
            app_name,
        }
    }

    /// Alert `user` about a sign-in from `ip_address`.
    ///
    /// Returns `true` only if the transport accepted the message. A throttled
    /// call returns `false` without side effects. Transport failures are
    /// logged and never retried.
    pub async fn notify_new_login(
        &self,
        user: &user::Model,
        ip_address: &str,
        device_info: Option<&str>,
    ) -> bool {
        if !self.throttle.try_claim(&user.id, ip_address).await {
            tracing::debug!(user_id = %user.id, ip = %ip_address, "Security alert throttled");
            return false;
        }

        let subject = format!("[{}] New sign-in to your account", self.app_name);
        let body = self.render(user, ip_address, device_info, self.clock.now());

        match self.mailer.send(&user.email, &subject, &body).await {
            Ok(()) => {
                tracing::info!(user_id = %user.id, ip = %ip_address, "Security alert sent");
                true
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user.id,
                    ip = %ip_address,
                    error = %e,
                    "Failed to send security alert"
                );
                false
            }
        }
    }

    fn render(
        &self,
        user: &user::Model,
        ip_address: &str,
        device_info: Option<&str>,
        at: DateTime<Utc>,
    ) -> String {
        let device = device_info
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(UNKNOWN_DEVICE);
        let when = at.with_timezone(&self.timezone).format("%d/%m/%Y %H:%M:%S");

        format!(
            r#"<!DOCTYPE html>
<html>
<body style="font-family: sans-serif; color: #222;">
  <h2>New sign-in detected</h2>
  <p>Hello {name},</p>
  <p>Your {app} account was just accessed from an address we have not seen marked as trusted.</p>
  <table>
    <tr><td><strong>IP address</strong></td><td>{ip}</td></tr>
    <tr><td><strong>Device</strong></td><td>{device}</td></tr>
    <tr><td><strong>Time</strong></td><td>{when} ({tz})</td></tr>
  </table>
  <p>If this was you, you can mark this address as trusted in your security settings and you will not be alerted about it again.</p>
  <p>If you do not recognize this sign-in, change your password immediately.</p>
</body>
</html>
"#,
            name = escape_html(&user.name),
            app = escape_html(&self.app_name),
            ip = escape_html(ip_address),
            device = escape_html(device),
            when = when,
            tz = self.timezone.name(),
        )
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use crate::testing::{FailingMailSender, RecordingMailSender};
    use chrono::{TimeDelta, TimeZone};
    use std::sync::Arc;

    fn test_user() -> user::Model {
        user::Model {
            id: "user1".to_string(),
            name: "Ana <Admin>".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: String::new(),
            is_admin: false,
            pin_enabled: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(mailer: SharedMailSender) -> (SecurityAlertService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap(),
        ));
        let throttle = NotificationThrottle::new(10, clock.clone());
        let service = SecurityAlertService::new(
            throttle,
            mailer,
            clock.clone(),
            chrono_tz::America::Sao_Paulo,
            "Keyward".to_string(),
        );
        (service, clock)
    }

    #[tokio::test]
    async fn test_sends_once_per_window() {
        let mailer = Arc::new(RecordingMailSender::default());
        let (service, clock) = service(mailer.clone());
        let user = test_user();

        assert!(service.notify_new_login(&user, "1.2.3.4", Some("Firefox")).await);
        assert!(!service.notify_new_login(&user, "1.2.3.4", Some("Firefox")).await);
        assert_eq!(mailer.sent().len(), 1);

        clock.advance(TimeDelta::seconds(10));
        assert!(service.notify_new_login(&user, "1.2.3.4", Some("Firefox")).await);
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_message_content() {
        let mailer = Arc::new(RecordingMailSender::default());
        let (service, _clock) = service(mailer.clone());

        service.notify_new_login(&test_user(), "1.2.3.4", None).await;

        let sent = mailer.sent();
        assert_eq!(sent[0].to, "ana@example.com");
        assert!(sent[0].subject.contains("Keyward"));
        assert!(sent[0].html_body.contains("1.2.3.4"));
        assert!(sent[0].html_body.contains(UNKNOWN_DEVICE));
        // 15:30 UTC is 12:30 in Sao Paulo
        assert!(sent[0].html_body.contains("10/03/2024 12:30:00"));
        assert!(sent[0].html_body.contains("Ana &lt;Admin&gt;"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_swallowed() {
        let mailer = Arc::new(FailingMailSender::default());
        let (service, _clock) = service(mailer.clone());
        let user = test_user();

        assert!(!service.notify_new_login(&user, "1.2.3.4", None).await);
        assert_eq!(mailer.attempts(), 1);

        // the claim stands, so no retry inside the window
        assert!(!service.notify_new_login(&user, "1.2.3.4", None).await);
        assert_eq!(mailer.attempts(), 1);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>"x" & 'y'</script>"#),
            "&lt;script&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }
}
