//! In-process stream transport.
//!
//! Implements the same consumer-group contract as the Redis transport
//! against local state: an append-only log, one cursor per group, and a
//! pending-entry table per group for ack/reclaim semantics. Reads genuinely
//! await a publish instead of spinning. Used by tests and dev wiring.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

use sb_common::{StreamEntry, WorkItem};

use crate::{Result, StreamConsumer, StreamPublisher};

struct PendingEntry {
    log_index: usize,
    consumer: String,
    delivered_at: Instant,
}

#[derive(Default)]
struct GroupState {
    /// Index of the next log entry not yet delivered to any consumer.
    cursor: usize,
    /// Delivered-but-unacked entries, keyed by entry id.
    pending: HashMap<String, PendingEntry>,
}

#[derive(Default)]
struct Inner {
    log: Vec<(String, WorkItem)>,
    groups: HashMap<String, GroupState>,
    next_seq: u64,
}

/// Stream transport backed by process-local memory.
#[derive(Clone)]
pub struct MemoryStreamTransport {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
    block_timeout: Duration,
}

impl Default for MemoryStreamTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStreamTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            notify: Arc::new(Notify::new()),
            block_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_block_timeout(mut self, timeout: Duration) -> Self {
        self.block_timeout = timeout;
        self
    }

    /// Total entries ever appended (the log is never trimmed).
    pub fn log_len(&self) -> usize {
        self.inner.lock().log.len()
    }

    /// Delivered-but-unacked entry count for a group.
    pub fn pending_count(&self, group: &str) -> usize {
        self.inner
            .lock()
            .groups
            .get(group)
            .map(|g| g.pending.len())
            .unwrap_or(0)
    }

    fn try_read(&self, group: &str, consumer: &str, max_count: usize) -> Vec<StreamEntry> {
        let mut inner = self.inner.lock();
        let log_len = inner.log.len();
        let state = inner.groups.entry(group.to_string()).or_default();

        let take = (log_len - state.cursor).min(max_count);
        if take == 0 {
            return Vec::new();
        }

        let start = state.cursor;
        state.cursor += take;
        let now = Instant::now();
        let mut pending = Vec::with_capacity(take);
        for index in start..start + take {
            let (id, _) = &inner.log[index];
            pending.push((id.clone(), index));
        }
        let state = inner.groups.get_mut(group).expect("group just inserted");
        for (id, index) in &pending {
            state.pending.insert(
                id.clone(),
                PendingEntry {
                    log_index: *index,
                    consumer: consumer.to_string(),
                    delivered_at: now,
                },
            );
        }

        pending
            .into_iter()
            .map(|(id, index)| StreamEntry {
                id,
                item: inner.log[index].1.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl StreamPublisher for MemoryStreamTransport {
    async fn publish(&self, item: &WorkItem) -> Result<String> {
        let id = {
            let mut inner = self.inner.lock();
            inner.next_seq += 1;
            let id = format!("{}-0", inner.next_seq);
            inner.log.push((id.clone(), item.clone()));
            id
        };
        self.notify.notify_waiters();
        Ok(id)
    }
}

#[async_trait]
impl StreamConsumer for MemoryStreamTransport {
    async fn ensure_group(&self, group: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.groups.entry(group.to_string()).or_default();
        Ok(())
    }

    async fn read_group(
        &self,
        group: &str,
        consumer: &str,
        max_count: usize,
    ) -> Result<Vec<StreamEntry>> {
        let deadline = Instant::now() + self.block_timeout;
        loop {
            // Register for wakeups before checking state so a publish racing
            // the check cannot be missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let batch = self.try_read(group, consumer, max_count);
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(deadline - now) => return Ok(Vec::new()),
            }
        }
    }

    async fn claim_stale(
        &self,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        max_count: usize,
    ) -> Result<Vec<StreamEntry>> {
        let mut inner = self.inner.lock();
        let Some(state) = inner.groups.get_mut(group) else {
            return Ok(Vec::new());
        };

        let now = Instant::now();
        let mut claimed: Vec<(String, usize)> = state
            .pending
            .iter()
            .filter(|(_, p)| now.duration_since(p.delivered_at) >= min_idle)
            .map(|(id, p)| (id.clone(), p.log_index))
            .collect();
        claimed.sort_by(|a, b| a.1.cmp(&b.1));
        claimed.truncate(max_count);

        for (id, _) in &claimed {
            let p = state.pending.get_mut(id).expect("entry just selected");
            p.consumer = consumer.to_string();
            p.delivered_at = now;
        }

        Ok(claimed
            .into_iter()
            .map(|(id, index)| StreamEntry {
                id,
                item: inner.log[index].1.clone(),
            })
            .collect())
    }

    async fn ack(&self, group: &str, entry_id: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(state) = inner.groups.get_mut(group) {
            // Unknown or already-acked ids are a no-op.
            state.pending.remove(entry_id);
        }
        Ok(())
    }
}
