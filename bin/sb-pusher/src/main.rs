//! SiteBeat Catalog Pusher
//!
//! Republishes the full monitored-website catalog onto the stream on a
//! fixed cadence, one work item per website per cycle. Every probing
//! region's consumer group independently receives the full set.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DATABASE_URL` | (required) | Postgres connection string |
//! | `REDIS_URL` | `redis://127.0.0.1:6379` | Stream endpoint |
//! | `SITEBEAT_PUSH_INTERVAL_SECS` | `3` | Publish cadence |
//! | `SITEBEAT_HEALTH_PORT` | `9091` | Health endpoint port |
//! | `RUST_LOG` | `info` | Log level |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tokio::sync::watch;
use tracing::info;

use sb_common::config::PusherConfig;
use sb_monitor::CatalogPusher;
use sb_store::PgWebsiteRepository;
use sb_stream::RedisStreamTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sb_common::logging::init_logging("sb-pusher");

    let config = PusherConfig::from_env()?;
    info!(
        interval_secs = config.push_interval.as_secs(),
        stream = %config.stream_key,
        "Starting SiteBeat catalog pusher"
    );

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    info!("Connected to Postgres");

    let transport = RedisStreamTransport::connect(&config.redis_url, &config.stream_key).await?;
    info!(stream = %config.stream_key, "Connected to Redis stream");

    let catalog = Arc::new(PgWebsiteRepository::new(pool));
    let pusher = CatalogPusher::new(catalog, Arc::new(transport), config.push_interval);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    spawn_health_server(config.health_port).await?;

    pusher.run(shutdown_rx).await;
    info!("Pusher stopped");
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
