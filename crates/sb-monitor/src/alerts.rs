//! Status tracking and debounced alert notification.
//!
//! Runs after each tick is recorded. Three branches:
//! (a) status unchanged -> nothing;
//! (b) changed inside the debounce window -> suppressed, and deliberately
//!     without a state update, so the flap is re-evaluated on every tick
//!     until the window elapses;
//! (c) changed outside the window -> one alert email, then an unconditional
//!     compare-and-set of `last_status`/`last_notification_sent`.
//!
//! Mailer failures are logged and swallowed: a provider outage must never
//! block tick recording, acking, or the state update (which would otherwise
//! retry-storm the alert on every subsequent tick).

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use sb_common::WebsiteStatus;
use sb_notify::AlertMailer;
use sb_store::StatusStore;

use crate::Result;

pub struct AlertEvaluator {
    store: Arc<dyn StatusStore>,
    mailer: Arc<dyn AlertMailer>,
    debounce_window: ChronoDuration,
}

impl AlertEvaluator {
    /// Default minimum gap between two notifications for one website.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(300);

    pub fn new(
        store: Arc<dyn StatusStore>,
        mailer: Arc<dyn AlertMailer>,
        debounce_window: Duration,
    ) -> Self {
        Self {
            store,
            mailer,
            debounce_window: ChronoDuration::from_std(debounce_window)
                .unwrap_or_else(|_| ChronoDuration::seconds(300)),
        }
    }

    /// Evaluate a freshly recorded tick's status against the website's last
    /// known status and notify on a genuine transition.
    pub async fn evaluate(&self, website_id: &str, new_status: WebsiteStatus) -> Result<()> {
        let Some(website) = self.store.get_website_with_owner(website_id).await? else {
            // Deleted mid-flight; the tick already recorded is harmless.
            debug!(website_id = %website_id, "Website gone, skipping alert evaluation");
            return Ok(());
        };

        // (a) no transition.
        if new_status == website.last_status {
            return Ok(());
        }

        let now = Utc::now();

        // (b) transition inside the debounce window: suppress, and leave the
        // stored state untouched for re-evaluation on the next tick.
        if let Some(last_sent) = website.last_notification_sent {
            if now - last_sent < self.debounce_window {
                debug!(
                    website_id = %website.id,
                    from = %website.last_status,
                    to = %new_status,
                    "Transition inside debounce window, notification suppressed"
                );
                return Ok(());
            }
        }

        // (c) genuine transition: at most one email, errors swallowed.
        let send_result = match new_status {
            WebsiteStatus::Down => {
                info!(website_id = %website.id, url = %website.url, "Website went down");
                self.mailer
                    .send_downtime_alert(&website.owner_email, &website.url, now)
                    .await
            }
            WebsiteStatus::Up if website.last_status == WebsiteStatus::Down => {
                // Best-effort downtime estimate: elapsed since the downtime
                // notification, not since the first failed probe.
                let downtime = website
                    .last_notification_sent
                    .map(|sent| now - sent)
                    .unwrap_or_else(ChronoDuration::zero)
                    .max(ChronoDuration::zero());
                info!(
                    website_id = %website.id,
                    url = %website.url,
                    downtime_secs = downtime.num_seconds(),
                    "Website restored"
                );
                self.mailer
                    .send_uptime_restored_alert(&website.owner_email, &website.url, now, downtime)
                    .await
            }
            // Up from Unknown: record the transition, nothing to announce.
            _ => Ok(()),
        };

        if let Err(e) = send_result {
            warn!(website_id = %website.id, error = %e, "Alert email dispatch failed");
        }

        // The state update runs regardless of the send outcome. Conditional
        // on the status this decision was based on: losing the race to a
        // concurrent worker drops this update rather than clobbering theirs.
        let committed = self
            .store
            .update_website_status_if(&website.id, website.last_status, new_status, now)
            .await?;
        if !committed {
            debug!(
                website_id = %website.id,
                "Concurrent status transition won, dropping stale update"
            );
        }

        Ok(())
    }
}
