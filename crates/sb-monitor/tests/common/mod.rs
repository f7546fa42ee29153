//! Shared mock collaborators for the core tests.
#![allow(dead_code)] // not every test binary uses every mock

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use sb_common::{MonitoredWebsite, NewTick, WebsiteStatus, WebsiteSummary};
use sb_monitor::{Probe, ProbeOutcome};
use sb_notify::{AlertMailer, NotifyError};
use sb_store::{StatusStore, StoreError, TickSink, WebsiteCatalog};

pub struct MockCatalog {
    websites: Mutex<Vec<WebsiteSummary>>,
    pub fail: AtomicBool,
}

impl MockCatalog {
    pub fn new(websites: Vec<WebsiteSummary>) -> Self {
        Self {
            websites: Mutex::new(websites),
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl WebsiteCatalog for MockCatalog {
    async fn list_websites(&self) -> sb_store::Result<Vec<WebsiteSummary>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.websites.lock().clone())
    }
}

pub struct RecordingTickSink {
    ticks: Mutex<Vec<NewTick>>,
    pub fail: AtomicBool,
}

impl RecordingTickSink {
    pub fn new() -> Self {
        Self {
            ticks: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn ticks(&self) -> Vec<NewTick> {
        self.ticks.lock().clone()
    }
}

#[async_trait]
impl TickSink for RecordingTickSink {
    async fn record_tick(&self, tick: &NewTick) -> sb_store::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.ticks.lock().push(tick.clone());
        Ok(())
    }
}

/// In-memory website table with the same compare-and-set semantics as the
/// Postgres implementation.
pub struct MockStatusStore {
    sites: Mutex<HashMap<String, MonitoredWebsite>>,
}

impl MockStatusStore {
    pub fn new() -> Self {
        Self {
            sites: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(
        &self,
        id: &str,
        url: &str,
        last_status: WebsiteStatus,
        last_notification_sent: Option<DateTime<Utc>>,
    ) {
        self.sites.lock().insert(
            id.to_string(),
            MonitoredWebsite {
                id: id.to_string(),
                url: url.to_string(),
                owner_email: format!("owner-of-{id}@example.com"),
                last_status,
                last_notification_sent,
            },
        );
    }

    pub fn site(&self, id: &str) -> Option<MonitoredWebsite> {
        self.sites.lock().get(id).cloned()
    }

    /// Overwrite the stored status out-of-band, as a concurrent worker would.
    pub fn force_status(&self, id: &str, status: WebsiteStatus) {
        if let Some(site) = self.sites.lock().get_mut(id) {
            site.last_status = status;
        }
    }
}

#[async_trait]
impl StatusStore for MockStatusStore {
    async fn get_website_with_owner(
        &self,
        website_id: &str,
    ) -> sb_store::Result<Option<MonitoredWebsite>> {
        Ok(self.sites.lock().get(website_id).cloned())
    }

    async fn update_website_status_if(
        &self,
        website_id: &str,
        expected: WebsiteStatus,
        new_status: WebsiteStatus,
        notified_at: DateTime<Utc>,
    ) -> sb_store::Result<bool> {
        let mut sites = self.sites.lock();
        match sites.get_mut(website_id) {
            Some(site) if site.last_status == expected => {
                site.last_status = new_status;
                site.last_notification_sent = Some(notified_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

pub struct RecordingMailer {
    pub down_alerts: Mutex<Vec<(String, String)>>,
    pub restored_alerts: Mutex<Vec<(String, String, ChronoDuration)>>,
    pub fail: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            down_alerts: Mutex::new(Vec::new()),
            restored_alerts: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn total_sent(&self) -> usize {
        self.down_alerts.lock().len() + self.restored_alerts.lock().len()
    }
}

#[async_trait]
impl AlertMailer for RecordingMailer {
    async fn send_downtime_alert(
        &self,
        to: &str,
        url: &str,
        _at: DateTime<Utc>,
    ) -> sb_notify::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Provider {
                status: 503,
                body: "simulated outage".to_string(),
            });
        }
        self.down_alerts.lock().push((to.to_string(), url.to_string()));
        Ok(())
    }

    async fn send_uptime_restored_alert(
        &self,
        to: &str,
        url: &str,
        _at: DateTime<Utc>,
        downtime: ChronoDuration,
    ) -> sb_notify::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Provider {
                status: 503,
                body: "simulated outage".to_string(),
            });
        }
        self.restored_alerts
            .lock()
            .push((to.to_string(), url.to_string(), downtime));
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Probe that answers from a fixed url -> status table (default `Up`).
pub struct StaticProbe {
    outcomes: Mutex<HashMap<String, WebsiteStatus>>,
}

impl StaticProbe {
    pub fn all_up() -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, url: &str, status: WebsiteStatus) {
        self.outcomes.lock().insert(url.to_string(), status);
    }
}

#[async_trait]
impl Probe for StaticProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let status = self
            .outcomes
            .lock()
            .get(url)
            .copied()
            .unwrap_or(WebsiteStatus::Up);
        ProbeOutcome {
            status,
            response_time_ms: 12,
        }
    }
}
