//! Sign-in follow-up: record the address, alert on untrusted ones.

use keyward_common::AppResult;
use keyward_db::entities::user;
use tokio::task::JoinHandle;

use super::background::BackgroundTasks;
use super::login_ip::LoginIpService;
use super::security_alert::SecurityAlertService;

/// What happened after a sign-in was tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginTrackOutcome {
    /// First sign-in from this address.
    pub is_new_ip: bool,
    /// The address is marked trusted.
    pub is_trusted: bool,
    /// An alert was handed to the mail transport.
    pub notified: bool,
}

/// Runs address tracking and alerting for successful sign-ins.
#[derive(Clone)]
pub struct LoginMonitor {
    tracker: LoginIpService,
    alerts: SecurityAlertService,
    tasks: BackgroundTasks,
}

impl LoginMonitor {
    /// Create a new monitor.
    #[must_use]
    pub const fn new(
        tracker: LoginIpService,
        alerts: SecurityAlertService,
        tasks: BackgroundTasks,
    ) -> Self {
        Self {
            tracker,
            alerts,
            tasks,
        }
    }

    /// Record the sign-in and alert if the address is not trusted.
    pub async fn track(
        &self,
        user: &user::Model,
        ip_address: &str,
        device_info: Option<&str>,
    ) -> AppResult<LoginTrackOutcome> {
        let outcome = self
            .tracker
            .record_login(&user.id, ip_address, device_info)
            .await?;
        let is_trusted = outcome.record.is_trusted;

        let notified = if is_trusted {
            false
        } else {
            self.alerts
                .notify_new_login(user, ip_address, outcome.record.device_info.as_deref())
                .await
        };

        Ok(LoginTrackOutcome {
            is_new_ip: outcome.is_new_ip,
            is_trusted,
            notified,
        })
    }

    /// Run [`LoginMonitor::track`] detached from the sign-in response.
    pub fn spawn_track(
        &self,
        user: user::Model,
        ip_address: String,
        device_info: Option<String>,
    ) -> JoinHandle<()> {
        let monitor = self.clone();
        self.tasks.spawn("login_tracking", async move {
            let outcome = monitor
                .track(&user, &ip_address, device_info.as_deref())
                .await?;
            tracing::debug!(
                user_id = %user.id,
                ip = %ip_address,
                is_new_ip = outcome.is_new_ip,
                notified = outcome.notified,
                "Sign-in tracked"
            );
            Ok(())
        })
    }
}
