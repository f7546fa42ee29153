//! PostgreSQL repository implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;

use sb_common::{MonitoredWebsite, NewTick, WebsiteStatus, WebsiteSummary};

use crate::{Result, StatusStore, TickSink, WebsiteCatalog};

/// Catalog reads and alerting-state writes over the websites table.
pub struct PgWebsiteRepository {
    pool: PgPool,
}

impl PgWebsiteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn parse_monitored(row: &sqlx::postgres::PgRow) -> MonitoredWebsite {
        let last_status: String = row.get("last_status");
        MonitoredWebsite {
            id: row.get("id"),
            url: row.get("url"),
            owner_email: row.get("owner_email"),
            last_status: WebsiteStatus::from_str(&last_status),
            last_notification_sent: row.get("last_notification_sent"),
        }
    }
}

#[async_trait]
impl WebsiteCatalog for PgWebsiteRepository {
    async fn list_websites(&self) -> Result<Vec<WebsiteSummary>> {
        let rows = sqlx::query("SELECT id, url FROM websites ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let websites = rows
            .iter()
            .map(|row| WebsiteSummary {
                id: row.get("id"),
                url: row.get("url"),
            })
            .collect::<Vec<_>>();

        debug!(count = websites.len(), "Fetched website catalog");
        Ok(websites)
    }
}

#[async_trait]
impl StatusStore for PgWebsiteRepository {
    async fn get_website_with_owner(&self, website_id: &str) -> Result<Option<MonitoredWebsite>> {
        let row = sqlx::query(
            "SELECT id, url, owner_email, last_status, last_notification_sent \
             FROM websites WHERE id = $1",
        )
        .bind(website_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::parse_monitored))
    }

    async fn update_website_status_if(
        &self,
        website_id: &str,
        expected: WebsiteStatus,
        new_status: WebsiteStatus,
        notified_at: DateTime<Utc>,
    ) -> Result<bool> {
        // Conditional on the status the caller based its decision on; zero
        // rows affected means a concurrent worker committed first.
        let result = sqlx::query(
            "UPDATE websites \
             SET last_status = $1, last_notification_sent = $2 \
             WHERE id = $3 AND last_status = $4",
        )
        .bind(new_status.as_str())
        .bind(notified_at)
        .bind(website_id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Append-only writer for the website_ticks table.
pub struct PgTickRepository {
    pool: PgPool,
}

impl PgTickRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TickSink for PgTickRepository {
    async fn record_tick(&self, tick: &NewTick) -> Result<()> {
        sqlx::query(
            "INSERT INTO website_ticks (website_id, region_id, status, response_time_ms) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&tick.website_id)
        .bind(&tick.region_id)
        .bind(tick.status.as_str())
        .bind(tick.response_time_ms)
        .execute(&self.pool)
        .await?;

        debug!(
            website_id = %tick.website_id,
            region = %tick.region_id,
            status = %tick.status,
            response_time_ms = tick.response_time_ms,
            "Recorded tick"
        );
        Ok(())
    }
}
