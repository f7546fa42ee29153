//! Catalog pusher.
//!
//! On a fixed cadence, republishes every monitored website as one work item
//! on the stream. There is no deduplication across cycles and no
//! backpressure: if a region's workers fall behind, its group simply
//! accumulates pending entries.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use sb_common::WorkItem;
use sb_store::WebsiteCatalog;
use sb_stream::StreamPublisher;

use crate::Result;

pub struct CatalogPusher {
    catalog: Arc<dyn WebsiteCatalog>,
    publisher: Arc<dyn StreamPublisher>,
    push_interval: Duration,
}

impl CatalogPusher {
    pub fn new(
        catalog: Arc<dyn WebsiteCatalog>,
        publisher: Arc<dyn StreamPublisher>,
        push_interval: Duration,
    ) -> Self {
        Self {
            catalog,
            publisher,
            push_interval,
        }
    }

    /// Read the full catalog and publish one work item per website, in
    /// catalog order. Returns the number of items published.
    pub async fn push_cycle(&self) -> Result<usize> {
        let websites = self.catalog.list_websites().await?;
        for website in &websites {
            self.publisher
                .publish(&WorkItem {
                    website_id: website.id.clone(),
                    url: website.url.clone(),
                })
                .await?;
        }
        Ok(websites.len())
    }

    /// Run the publish loop until the shutdown flag flips. A failed cycle is
    /// logged and skipped; the next timer tick retries from scratch.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.push_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.push_interval.as_secs(), "Catalog pusher started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.push_cycle().await {
                        Ok(count) => info!(count = count, "Published catalog to stream"),
                        Err(e) => warn!(error = %e, "Push cycle failed, retrying next tick"),
                    }
                }
                changed = shutdown.changed() => {
                    // A dropped sender counts as a shutdown request.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Catalog pusher stopped");
    }
}
