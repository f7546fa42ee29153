//! Relational store access for the monitoring core.
//!
//! The websites table is owned by the out-of-scope CRUD API; this crate only
//! reads the catalog, appends tick rows, and performs the one read-modify-
//! write the notifier needs, expressed as a compare-and-set so concurrent
//! workers cannot clobber each other's status transitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use sb_common::{MonitoredWebsite, NewTick, WebsiteStatus, WebsiteSummary};

pub mod postgres;

pub use postgres::{PgTickRepository, PgWebsiteRepository};

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read-only view of the monitored-website catalog.
#[async_trait]
pub trait WebsiteCatalog: Send + Sync {
    /// Full catalog scan, one row per monitored website, in catalog order.
    async fn list_websites(&self) -> Result<Vec<WebsiteSummary>>;
}

/// Append-only sink for probe outcomes.
#[async_trait]
pub trait TickSink: Send + Sync {
    async fn record_tick(&self, tick: &NewTick) -> Result<()>;
}

/// Read-modify-write surface for a website's alerting state.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Load the website's alerting state plus its owner's email address.
    /// Returns None when the website was deleted mid-flight.
    async fn get_website_with_owner(&self, website_id: &str) -> Result<Option<MonitoredWebsite>>;

    /// Atomically update `last_status`/`last_notification_sent` iff the
    /// stored status still equals `expected`. Returns false when another
    /// worker committed a transition first; the caller's decision is then
    /// stale and must be dropped, not retried.
    async fn update_website_status_if(
        &self,
        website_id: &str,
        expected: WebsiteStatus,
        new_status: WebsiteStatus,
        notified_at: DateTime<Utc>,
    ) -> Result<bool>;
}

/// Reference DDL for the slice of the schema this crate touches. The API
/// service owns the real migrations; this is documentation for operators
/// standing up an isolated probe environment.
pub const REFERENCE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS websites (
    id                      TEXT PRIMARY KEY,
    url                     TEXT NOT NULL,
    user_id                 TEXT NOT NULL,
    owner_email             TEXT NOT NULL,
    last_status             TEXT NOT NULL DEFAULT 'Unknown',
    last_notification_sent  TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS website_ticks (
    id                TEXT PRIMARY KEY DEFAULT gen_random_uuid()::text,
    website_id        TEXT NOT NULL REFERENCES websites(id),
    region_id         TEXT NOT NULL,
    status            TEXT NOT NULL,
    response_time_ms  BIGINT NOT NULL,
    created_at        TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#;
