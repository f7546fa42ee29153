use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod logging;

// ============================================================================
// Core Monitoring Types
// ============================================================================

/// Reachability status of a monitored website.
///
/// Stored as text in the database; unknown values decode to `Unknown` so a
/// schema drift never panics a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebsiteStatus {
    Up,
    Down,
    Unknown,
}

impl WebsiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebsiteStatus::Up => "Up",
            WebsiteStatus::Down => "Down",
            WebsiteStatus::Unknown => "Unknown",
        }
    }

    /// Decode from stored text, defaulting to `Unknown` for unrecognized values.
    pub fn from_str(s: &str) -> Self {
        match s {
            "Up" => WebsiteStatus::Up,
            "Down" => WebsiteStatus::Down,
            _ => WebsiteStatus::Unknown,
        }
    }
}

impl Default for WebsiteStatus {
    fn default() -> Self {
        WebsiteStatus::Unknown
    }
}

impl std::fmt::Display for WebsiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of work placed on the stream: one per website per publish cycle.
///
/// Wire format is the ordered field set `{url, id}` on the stream entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub website_id: String,
    pub url: String,
}

/// A work item as delivered from the stream, with its stream-assigned id.
///
/// Entry ids are monotonic within the log. Acking an entry removes it from
/// the consumer group's pending list but never from the log itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub id: String,
    pub item: WorkItem,
}

// ============================================================================
// Tick Types
// ============================================================================

/// One reachability measurement, ready to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTick {
    pub website_id: String,
    pub region_id: String,
    pub status: WebsiteStatus,
    pub response_time_ms: i64,
}

// ============================================================================
// Website Projections
// ============================================================================

/// Catalog projection used by the pusher: just enough to publish a work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteSummary {
    pub id: String,
    pub url: String,
}

/// Notifier projection: the website's alerting state plus its owner's address.
#[derive(Debug, Clone)]
pub struct MonitoredWebsite {
    pub id: String,
    pub url: String,
    pub owner_email: String,
    pub last_status: WebsiteStatus,
    pub last_notification_sent: Option<DateTime<Utc>>,
}
