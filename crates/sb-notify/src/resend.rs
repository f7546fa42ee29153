//! Resend HTTP API mailer.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::info;

use crate::{format_downtime, AlertMailer, NotifyError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Delivers alert emails through the Resend API.
pub struct ResendMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from_email: String,
    /// Base URL for the dashboard link inside email bodies.
    frontend_url: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from_email: String, frontend_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: RESEND_API_URL.to_string(),
            api_key,
            from_email,
            frontend_url,
        }
    }

    /// Point at a different API endpoint (used by tests).
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from_email,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        info!(to = %to, subject = %subject, "Alert email sent");
        Ok(())
    }

    fn dashboard_link(&self) -> String {
        format!("{}/dashboard", self.frontend_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AlertMailer for ResendMailer {
    async fn send_downtime_alert(&self, to: &str, url: &str, at: DateTime<Utc>) -> Result<()> {
        let subject = format!("Alert: {url} is DOWN");
        let detected_at = at.format("%A, %B %-d, %Y at %H:%M:%S UTC");
        let dashboard = self.dashboard_link();
        let html = format!(
            r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
    <h1 style="color: #dc2626;">Downtime Alert</h1>
    <div style="background: #fef2f2; border-left: 4px solid #dc2626; padding: 16px;">
      <p style="font-weight: 600;">Your monitored website is currently experiencing downtime:</p>
      <p style="font-size: 18px; font-weight: 600; color: #dc2626; word-break: break-all;">{url}</p>
      <p style="color: #6b7280; font-size: 13px;">Detected at: {detected_at}</p>
    </div>
    <p>We detected that your website is not responding. Monitoring continues and you will be notified when it is back online.</p>
    <ul style="color: #4b5563;">
      <li>Check your server status and resource usage</li>
      <li>Review server logs for errors or crashes</li>
      <li>Verify DNS configuration and domain settings</li>
      <li>Contact your hosting provider if needed</li>
    </ul>
    <p><a href="{dashboard}" style="background: #10b981; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px;">View Dashboard</a></p>
    <p style="color: #6b7280; font-size: 12px;">This is an automated alert from SiteBeat Monitoring.</p>
  </body>
</html>"#
        );
        self.send(to, &subject, &html).await
    }

    async fn send_uptime_restored_alert(
        &self,
        to: &str,
        url: &str,
        at: DateTime<Utc>,
        downtime: Duration,
    ) -> Result<()> {
        let subject = format!("Resolved: {url} is back ONLINE");
        let restored_at = at.format("%b %-d, %Y %H:%M UTC");
        let duration = format_downtime(downtime);
        let dashboard = self.dashboard_link();
        let html = format!(
            r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
    <h1 style="color: #10b981;">Service Restored</h1>
    <div style="background: #f0fdf4; border-left: 4px solid #10b981; padding: 16px;">
      <p style="font-weight: 600;">Good news! Your website is back online:</p>
      <p style="font-size: 18px; font-weight: 600; color: #10b981; word-break: break-all;">{url}</p>
    </div>
    <table style="width: 100%; color: #4b5563;">
      <tr><td style="font-weight: 600;">Restored at:</td><td>{restored_at}</td></tr>
      <tr><td style="font-weight: 600;">Downtime duration:</td><td>{duration}</td></tr>
    </table>
    <p>Your website is now responding normally. Monitoring continues to ensure it stays online.</p>
    <p><a href="{dashboard}" style="background: #10b981; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px;">View Dashboard</a></p>
    <p style="color: #6b7280; font-size: 12px;">This is an automated alert from SiteBeat Monitoring.</p>
  </body>
</html>"#
        );
        self.send(to, &subject, &html).await
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
