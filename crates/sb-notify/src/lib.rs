//! Outbound alert email dispatch.
//!
//! Provides:
//! - the `AlertMailer` trait the status tracker calls into
//! - `ResendMailer`, delivering through the Resend HTTP API
//! - `NoOpMailer`, selected when no API key is configured

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

pub mod resend;

pub use resend::ResendMailer;

pub type Result<T> = std::result::Result<T, NotifyError>;

#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Email provider rejected the request ({status}): {body}")]
    Provider { status: u16, body: String },
}

/// Alert email dispatch. Both operations fail by returning an error; the
/// caller decides whether a failed send blocks anything (it never does in
/// the worker, where send failures are logged and swallowed).
#[async_trait]
pub trait AlertMailer: Send + Sync {
    /// "Your site is down" alert.
    async fn send_downtime_alert(&self, to: &str, url: &str, at: DateTime<Utc>) -> Result<()>;

    /// "Your site is back online" alert with the estimated downtime.
    async fn send_uptime_restored_alert(
        &self,
        to: &str,
        url: &str,
        at: DateTime<Utc>,
        downtime: Duration,
    ) -> Result<()>;

    /// Whether this mailer actually delivers anything.
    fn is_enabled(&self) -> bool;
}

/// Mailer used when notification sending is disabled (no API key).
pub struct NoOpMailer;

#[async_trait]
impl AlertMailer for NoOpMailer {
    async fn send_downtime_alert(&self, to: &str, url: &str, _at: DateTime<Utc>) -> Result<()> {
        tracing::debug!(to = %to, url = %url, "Notifications disabled, skipping downtime alert");
        Ok(())
    }

    async fn send_uptime_restored_alert(
        &self,
        to: &str,
        url: &str,
        _at: DateTime<Utc>,
        _downtime: Duration,
    ) -> Result<()> {
        tracing::debug!(to = %to, url = %url, "Notifications disabled, skipping restored alert");
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Render a downtime duration for the restored-alert body, e.g. "1h 4m".
pub fn format_downtime(downtime: Duration) -> String {
    let total_minutes = downtime.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{}s", downtime.num_seconds().max(0))
    }
}
