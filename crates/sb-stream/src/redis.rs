//! Redis Streams transport.
//!
//! One stream key carries every published work item. Each probing region is
//! a consumer group on that key (`XGROUP CREATE ... MKSTREAM`), so every
//! region sees the full publish set while workers inside a region split it
//! between themselves. Reads block server-side (`XREADGROUP ... BLOCK`),
//! acks are `XACK`, and entries stuck pending on a dead consumer are
//! reclaimed with `XAUTOCLAIM`.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use ::redis::aio::ConnectionManager;
use ::redis::streams::{
    StreamAutoClaimOptions, StreamAutoClaimReply, StreamId, StreamReadOptions, StreamReadReply,
};
use ::redis::AsyncCommands;

use sb_common::{StreamEntry, WorkItem};

use crate::{Result, StreamConsumer, StreamPublisher};

/// Stream transport backed by Redis Streams.
#[derive(Clone)]
pub struct RedisStreamTransport {
    conn: ConnectionManager,
    stream_key: String,
    block_timeout: Duration,
}

impl RedisStreamTransport {
    /// Default server-side block timeout for group reads.
    pub const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_secs(5);

    pub async fn connect(redis_url: &str, stream_key: &str) -> Result<Self> {
        let client = ::redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            stream_key: stream_key.to_string(),
            block_timeout: Self::DEFAULT_BLOCK_TIMEOUT,
        })
    }

    /// Override the block timeout (the worker's read cadence upper bound).
    pub fn with_block_timeout(mut self, timeout: Duration) -> Self {
        self.block_timeout = timeout;
        self
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    /// Decode a raw stream entry into a work item, or None when the wire
    /// field set `{url, id}` is incomplete.
    fn decode_entry(raw: &StreamId) -> Option<StreamEntry> {
        let url: Option<String> = raw.get("url");
        let website_id: Option<String> = raw.get("id");
        match (url, website_id) {
            (Some(url), Some(website_id)) => Some(StreamEntry {
                id: raw.id.clone(),
                item: WorkItem { website_id, url },
            }),
            _ => None,
        }
    }

    /// Decode a delivered batch, acking malformed entries on the spot so
    /// they cannot sit pending forever.
    async fn decode_batch(&self, group: &str, raw_ids: &[StreamId]) -> Result<Vec<StreamEntry>> {
        let mut entries = Vec::with_capacity(raw_ids.len());
        for raw in raw_ids {
            match Self::decode_entry(raw) {
                Some(entry) => entries.push(entry),
                None => {
                    warn!(entry_id = %raw.id, group = %group, "Skipping malformed stream entry");
                    self.ack(group, &raw.id).await?;
                }
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl StreamPublisher for RedisStreamTransport {
    async fn publish(&self, item: &WorkItem) -> Result<String> {
        let mut conn = self.conn.clone();
        let id: String = conn
            .xadd(
                &self.stream_key,
                "*",
                &[("url", item.url.as_str()), ("id", item.website_id.as_str())],
            )
            .await?;
        Ok(id)
    }
}

#[async_trait]
impl StreamConsumer for RedisStreamTransport {
    async fn ensure_group(&self, group: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let created: std::result::Result<(), ::redis::RedisError> = conn
            .xgroup_create_mkstream(&self.stream_key, group, "$")
            .await;
        match created {
            Ok(()) => {
                debug!(group = %group, stream = %self.stream_key, "Consumer group created");
                Ok(())
            }
            // Group already exists; another worker of the region got there first.
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_group(
        &self,
        group: &str,
        consumer: &str,
        max_count: usize,
    ) -> Result<Vec<StreamEntry>> {
        let opts = StreamReadOptions::default()
            .group(group, consumer)
            .count(max_count)
            .block(self.block_timeout.as_millis() as usize);

        let mut conn = self.conn.clone();
        let reply: StreamReadReply = conn
            .xread_options(&[self.stream_key.as_str()], &[">"], &opts)
            .await?;

        let Some(key) = reply.keys.into_iter().next() else {
            // Block timeout elapsed with nothing pending.
            return Ok(Vec::new());
        };
        self.decode_batch(group, &key.ids).await
    }

    async fn claim_stale(
        &self,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        max_count: usize,
    ) -> Result<Vec<StreamEntry>> {
        let opts = StreamAutoClaimOptions::default().count(max_count);
        let mut conn = self.conn.clone();
        let reply: StreamAutoClaimReply = conn
            .xautoclaim_options(
                &self.stream_key,
                group,
                consumer,
                min_idle.as_millis() as usize,
                "0-0",
                opts,
            )
            .await?;

        if !reply.claimed.is_empty() {
            debug!(
                group = %group,
                consumer = %consumer,
                count = reply.claimed.len(),
                "Claimed stale pending entries"
            );
        }
        self.decode_batch(group, &reply.claimed).await
    }

    async fn ack(&self, group: &str, entry_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        // XACK of an already-acked id returns 0; both outcomes are success.
        let _acked: i64 = conn.xack(&self.stream_key, group, &[entry_id]).await?;
        Ok(())
    }

    async fn ack_batch(&self, group: &str, entry_ids: &[String]) -> Result<()> {
        if entry_ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _acked: i64 = conn.xack(&self.stream_key, group, entry_ids).await?;
        Ok(())
    }
}
