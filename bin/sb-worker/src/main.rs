//! SiteBeat Probe Worker
//!
//! Consumes work items from the region's consumer group, probes each
//! website, records ticks, and fires debounced status-change alerts.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DATABASE_URL` | (required) | Postgres connection string |
//! | `REGION_ID` | (required) | Probing region = consumer group name |
//! | `WORKER_ID` | `worker-<uuid>` | Consumer name within the group |
//! | `REDIS_URL` | `redis://127.0.0.1:6379` | Stream endpoint |
//! | `RESEND_API_KEY` | (unset: mail disabled) | Email provider API key |
//! | `SITEBEAT_HEALTH_PORT` | `9090` | Health endpoint port |
//! | `RUST_LOG` | `info` | Log level |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tokio::sync::watch;
use tracing::info;

use sb_common::config::WorkerConfig;
use sb_monitor::{AlertEvaluator, ProbeWorker, Prober, WorkerOptions};
use sb_notify::{AlertMailer, NoOpMailer, ResendMailer};
use sb_store::{PgTickRepository, PgWebsiteRepository};
use sb_stream::RedisStreamTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sb_common::logging::init_logging("sb-worker");

    // Missing required configuration is fatal before any connection is made.
    let config = WorkerConfig::from_env()?;
    info!(
        region = %config.region_id,
        worker = %config.worker_id,
        batch_size = config.batch_size,
        "Starting SiteBeat probe worker"
    );

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    info!("Connected to Postgres");

    let transport = RedisStreamTransport::connect(&config.redis_url, &config.stream_key)
        .await?
        .with_block_timeout(config.block_timeout);
    info!(stream = %config.stream_key, "Connected to Redis stream");

    let websites = Arc::new(PgWebsiteRepository::new(pool.clone()));
    let ticks = Arc::new(PgTickRepository::new(pool));

    let mailer: Arc<dyn AlertMailer> = match config.resend_api_key.clone() {
        Some(api_key) => {
            info!("Alert mailer enabled");
            Arc::new(ResendMailer::new(
                api_key,
                config.from_email.clone(),
                config.frontend_url.clone(),
            ))
        }
        None => {
            info!("RESEND_API_KEY not set, notification sending disabled");
            Arc::new(NoOpMailer)
        }
    };

    let alerts = AlertEvaluator::new(websites.clone(), mailer, config.debounce_window);
    let prober = Arc::new(Prober::new(config.probe_timeout)?);

    let worker = ProbeWorker::new(
        Arc::new(transport),
        prober,
        ticks,
        alerts,
        WorkerOptions {
            region_id: config.region_id.clone(),
            worker_id: config.worker_id.clone(),
            batch_size: config.batch_size,
            claim_min_idle: config.claim_min_idle,
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, draining in-flight batch");
            let _ = shutdown_tx.send(true);
        }
    });

    spawn_health_server(config.health_port).await?;

    worker.run(shutdown_rx).await?;
    info!("Worker stopped");
    Ok(())
}

async fn spawn_health_server(port: u16) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/q/health", get(|| async { Json(serde_json::json!({"status": "UP"})) }))
        .route("/q/health/live", get(|| async { Json(serde_json::json!({"status": "UP"})) }))
        .route("/q/health/ready", get(|| async { Json(serde_json::json!({"status": "UP"})) }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(?addr, "Health endpoint listening");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(())
}
