//! Suppression of repeated security alerts.
//!
//! Tracks, per user, the addresses an alert was recently sent for, each with
//! an expiry instant. Expired entries are ignored on read and removed either
//! on the next write for that user or by [`NotificationThrottle::sweep`].
//!
//! State lives in this process only. A restart forgets it and several
//! replicas will each send their own alert.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

use super::clock::SharedClock;

type Expiries = HashMap<String, HashMap<String, DateTime<Utc>>>;

/// Time-windowed dedup of alerts per `(user, ip)`.
#[derive(Clone)]
pub struct NotificationThrottle {
    window: TimeDelta,
    clock: SharedClock,
    entries: Arc<RwLock<Expiries>>,
}

impl NotificationThrottle {
    /// Create a throttle suppressing repeats for `window_secs` seconds.
    #[must_use]
    pub fn new(window_secs: u64, clock: SharedClock) -> Self {
        Self {
            window: i64::try_from(window_secs)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(TimeDelta::MAX),
            clock,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Whether an alert for this pair may be sent now.
    pub async fn should_notify(&self, user_id: &str, ip_address: &str) -> bool {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        !Self::is_suppressed(&entries, user_id, ip_address, now)
    }

    /// Record that an alert for this pair was just sent.
    pub async fn mark_notified(&self, user_id: &str, ip_address: &str) {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        self.insert(&mut entries, user_id, ip_address, now);
    }

    /// Check and mark under one lock.
    ///
    /// Returns `true` if the caller won the right to send. Concurrent callers
    /// for the same pair see at most one `true` per window.
    pub async fn try_claim(&self, user_id: &str, ip_address: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        if Self::is_suppressed(&entries, user_id, ip_address, now) {
            return false;
        }

        self.insert(&mut entries, user_id, ip_address, now);
        true
    }

    /// Drop every expired entry and any user left with none.
    ///
    /// Returns the number of entries removed.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let mut removed = 0;

        entries.retain(|_, ips| {
            let before = ips.len();
            ips.retain(|_, expiry| *expiry > now);
            removed += before - ips.len();
            !ips.is_empty()
        });

        removed
    }

    /// Number of users with at least one tracked address.
    pub async fn tracked_users(&self) -> usize {
        self.entries.read().await.len()
    }

    fn is_suppressed(entries: &Expiries, user_id: &str, ip_address: &str, now: DateTime<Utc>) -> bool {
        matches!(
            entries.get(user_id).and_then(|ips| ips.get(ip_address)),
            Some(expiry) if *expiry > now
        )
    }

    fn insert(&self, entries: &mut Expiries, user_id: &str, ip_address: &str, now: DateTime<Utc>) {
        let ips = entries.entry(user_id.to_string()).or_default();
        ips.retain(|_, expiry| *expiry > now);
        let expiry = now
            .checked_add_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        ips.insert(ip_address.to_string(), expiry);
    }
}
