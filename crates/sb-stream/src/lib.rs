//! Stream transport for monitor work items.
//!
//! A durable, ordered, append-only log with consumer-group semantics:
//! - every group independently receives every published item (fan-out,
//!   one group per probing region);
//! - within a group, each entry is delivered to exactly one consumer per
//!   delivery attempt (load-split across a region's workers);
//! - entries stay pending until acked and are reclaimable from consumers
//!   that stopped making progress.

use async_trait::async_trait;
use std::time::Duration;

use sb_common::{StreamEntry, WorkItem};

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStreamTransport;
pub use self::redis::RedisStreamTransport;

pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Malformed stream entry {id}: {reason}")]
    MalformedEntry { id: String, reason: String },
}

/// Appends work items to the log.
///
/// Publishing is fire-and-forget for callers: the pusher does not read back
/// what it wrote, and there is no backpressure signal from consumers.
#[async_trait]
pub trait StreamPublisher: Send + Sync {
    /// Append one item, returning the stream-assigned entry id.
    async fn publish(&self, item: &WorkItem) -> Result<String>;
}

/// Reads and acknowledges entries on behalf of one consumer group.
#[async_trait]
pub trait StreamConsumer: Send + Sync {
    /// Create the consumer group if it does not exist yet. Idempotent.
    async fn ensure_group(&self, group: &str) -> Result<()>;

    /// Return up to `max_count` entries not yet delivered to any consumer in
    /// `group`, blocking server-side up to the transport's configured block
    /// timeout. An empty result means the timeout elapsed with nothing
    /// pending; callers must not treat it as a spin signal.
    async fn read_group(
        &self,
        group: &str,
        consumer: &str,
        max_count: usize,
    ) -> Result<Vec<StreamEntry>>;

    /// Reclaim entries that have been pending longer than `min_idle` from
    /// other consumers of `group`. This is how a crashed worker's in-flight
    /// batch is eventually redelivered.
    async fn claim_stale(
        &self,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        max_count: usize,
    ) -> Result<Vec<StreamEntry>>;

    /// Mark one entry processed for `group`. Re-acking an already-acked or
    /// unknown id is a no-op.
    async fn ack(&self, group: &str, entry_id: &str) -> Result<()>;

    /// Ack a whole batch. Idempotent like [`ack`](Self::ack).
    async fn ack_batch(&self, group: &str, entry_ids: &[String]) -> Result<()> {
        for id in entry_ids {
            self.ack(group, id).await?;
        }
        Ok(())
    }
}
