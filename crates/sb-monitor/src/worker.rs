//! Probe worker: the per-process read/dispatch/ack loop.
//!
//! Each pass first reclaims entries left pending by a dead consumer of the
//! same group, then block-reads a fresh batch. Probes for a batch run
//! concurrently; every outcome becomes a tick (network failure is a `Down`
//! observation, not an error path). The batch is acked only after every
//! tick is durably recorded, so a crash mid-batch redelivers instead of
//! dropping: at-least-once, with idempotent effects downstream.

use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use sb_common::{NewTick, StreamEntry};
use sb_store::TickSink;
use sb_stream::StreamConsumer;

use crate::alerts::AlertEvaluator;
use crate::prober::Probe;
use crate::Result;

/// Recoverable-error backoff so a dead transport is retried, not spun on.
const READ_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Consumer group name; one group per region.
    pub region_id: String,
    /// Consumer name within the group; unique per worker process.
    pub worker_id: String,
    pub batch_size: usize,
    /// Pending entries idle longer than this are claimed from their original
    /// consumer and reprocessed here.
    pub claim_min_idle: Duration,
}

pub struct ProbeWorker {
    consumer: Arc<dyn StreamConsumer>,
    prober: Arc<dyn Probe>,
    ticks: Arc<dyn TickSink>,
    alerts: AlertEvaluator,
    options: WorkerOptions,
}

impl ProbeWorker {
    pub fn new(
        consumer: Arc<dyn StreamConsumer>,
        prober: Arc<dyn Probe>,
        ticks: Arc<dyn TickSink>,
        alerts: AlertEvaluator,
        options: WorkerOptions,
    ) -> Self {
        Self {
            consumer,
            prober,
            ticks,
            alerts,
            options,
        }
    }

    /// Run the worker loop until the shutdown flag flips. The in-flight
    /// batch is always drained (recorded and acked) before exit.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        self.consumer.ensure_group(&self.options.region_id).await?;
        info!(
            region = %self.options.region_id,
            worker = %self.options.worker_id,
            batch_size = self.options.batch_size,
            "Probe worker started"
        );

        while !*shutdown.borrow() {
            let batch = tokio::select! {
                batch = self.next_batch() => batch,
                changed = shutdown.changed() => {
                    // A dropped sender counts as a shutdown request.
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let batch = match batch {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(error = %e, "Stream read failed, backing off");
                    tokio::time::sleep(READ_ERROR_BACKOFF).await;
                    continue;
                }
            };
            if batch.is_empty() {
                // Server-side block timeout elapsed with nothing pending.
                continue;
            }

            if let Err(e) = self.process_batch(&batch).await {
                // Entries stay pending and will be redelivered; a retried
                // probe just records an extra tick.
                warn!(
                    error = %e,
                    count = batch.len(),
                    "Batch aborted before ack, entries remain pending"
                );
            }
        }

        info!(region = %self.options.region_id, worker = %self.options.worker_id, "Probe worker stopped");
        Ok(())
    }

    /// Stale reclaims first so a crashed sibling's work is not starved by a
    /// full publish cadence of fresh entries.
    async fn next_batch(&self) -> sb_stream::Result<Vec<StreamEntry>> {
        let claimed = self
            .consumer
            .claim_stale(
                &self.options.region_id,
                &self.options.worker_id,
                self.options.claim_min_idle,
                self.options.batch_size,
            )
            .await?;
        if !claimed.is_empty() {
            return Ok(claimed);
        }

        self.consumer
            .read_group(
                &self.options.region_id,
                &self.options.worker_id,
                self.options.batch_size,
            )
            .await
    }

    /// Probe every entry concurrently, record each outcome, evaluate alerts,
    /// then ack the whole batch. A tick-write failure aborts before the ack.
    async fn process_batch(&self, batch: &[StreamEntry]) -> Result<()> {
        debug!(count = batch.len(), "Processing batch");

        let outcomes = join_all(
            batch
                .iter()
                .map(|entry| self.prober.probe(&entry.item.url)),
        )
        .await;

        for (entry, outcome) in batch.iter().zip(&outcomes) {
            let tick = NewTick {
                website_id: entry.item.website_id.clone(),
                region_id: self.options.region_id.clone(),
                status: outcome.status,
                response_time_ms: outcome.response_time_ms,
            };
            self.ticks.record_tick(&tick).await?;

            // Alert evaluation must never block acking.
            if let Err(e) = self.alerts.evaluate(&entry.item.website_id, outcome.status).await {
                warn!(website_id = %entry.item.website_id, error = %e, "Alert evaluation failed");
            }
        }

        let ids: Vec<String> = batch.iter().map(|entry| entry.id.clone()).collect();
        self.consumer.ack_batch(&self.options.region_id, &ids).await?;
        debug!(count = ids.len(), "Batch acked");
        Ok(())
    }
}
