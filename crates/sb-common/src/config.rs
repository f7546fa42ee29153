//! Environment-sourced configuration for the pusher and worker binaries.
//!
//! Required values are validated up front; a missing required variable is a
//! startup error and the process exits. Everything else falls back to a
//! documented default.

use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_STREAM_KEY: &str = "sitebeat:website";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_FROM_EMAIL: &str = "SiteBeat <onboarding@resend.dev>";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(v) => v.parse().map_err(|_| ConfigError::InvalidVar {
            var,
            value: v.clone(),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration for the catalog pusher.
#[derive(Debug, Clone)]
pub struct PusherConfig {
    pub database_url: String,
    pub redis_url: String,
    pub stream_key: String,
    /// Full-catalog republish cadence.
    pub push_interval: Duration,
    pub health_port: u16,
}

impl PusherConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: env_or("REDIS_URL", DEFAULT_REDIS_URL),
            stream_key: env_or("SITEBEAT_STREAM_KEY", DEFAULT_STREAM_KEY),
            push_interval: Duration::from_secs(env_or_parse("SITEBEAT_PUSH_INTERVAL_SECS", 3u64)?),
            health_port: env_or_parse("SITEBEAT_HEALTH_PORT", 9091u16)?,
        })
    }
}

/// Configuration for a probe worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub redis_url: String,
    pub stream_key: String,
    /// Consumer group name; one group per region.
    pub region_id: String,
    /// Consumer name within the region's group.
    pub worker_id: String,
    pub batch_size: usize,
    /// Server-side block timeout for group reads.
    pub block_timeout: Duration,
    /// Minimum idle time before a pending entry is claimed from a dead consumer.
    pub claim_min_idle: Duration,
    pub probe_timeout: Duration,
    /// Minimum gap between two notifications for the same website.
    pub debounce_window: Duration,
    /// Resend API key; absence disables notification sending.
    pub resend_api_key: Option<String>,
    pub from_email: String,
    /// Base URL for dashboard links inside alert emails.
    pub frontend_url: String,
    pub health_port: u16,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: env_or("REDIS_URL", DEFAULT_REDIS_URL),
            stream_key: env_or("SITEBEAT_STREAM_KEY", DEFAULT_STREAM_KEY),
            region_id: required("REGION_ID")?,
            worker_id: env::var("WORKER_ID")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| format!("worker-{}", uuid::Uuid::new_v4())),
            batch_size: env_or_parse("SITEBEAT_BATCH_SIZE", 5usize)?,
            block_timeout: Duration::from_millis(env_or_parse("SITEBEAT_BLOCK_MS", 5_000u64)?),
            claim_min_idle: Duration::from_millis(env_or_parse("SITEBEAT_CLAIM_IDLE_MS", 60_000u64)?),
            probe_timeout: Duration::from_secs(env_or_parse("SITEBEAT_PROBE_TIMEOUT_SECS", 30u64)?),
            debounce_window: Duration::from_secs(env_or_parse("SITEBEAT_DEBOUNCE_SECS", 300u64)?),
            resend_api_key: env::var("RESEND_API_KEY").ok().filter(|v| !v.trim().is_empty()),
            from_email: env_or("SITEBEAT_FROM_EMAIL", DEFAULT_FROM_EMAIL),
            frontend_url: env_or("FRONTEND_URL", DEFAULT_FRONTEND_URL),
            health_port: env_or_parse("SITEBEAT_HEALTH_PORT", 9090u16)?,
        })
    }
}
