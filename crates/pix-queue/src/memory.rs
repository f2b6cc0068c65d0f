//! In-memory settlement broker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::{AckOutcome, Acker, Delivery, QueueError, Result, SettlementJob, SettlementQueue};

/// Delivery accounting, shared with tests to assert that the happy path
/// leaves no message unacknowledged.
#[derive(Debug, Default)]
pub struct QueueStats {
    published: AtomicU64,
    acked: AtomicU64,
    nacked: AtomicU64,
}

impl QueueStats {
    /// Messages published so far.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }

    /// Messages acked so far.
    #[must_use]
    pub fn acked(&self) -> u64 {
        self.acked.load(Ordering::SeqCst)
    }

    /// Messages nacked so far.
    #[must_use]
    pub fn nacked(&self) -> u64 {
        self.nacked.load(Ordering::SeqCst)
    }
}

/// In-memory [`SettlementQueue`] built on an unbounded tokio channel.
///
/// The receiver sits behind a `Mutex` so any number of consumer tasks can
/// compete for deliveries; each message reaches exactly one of them.
pub struct MemoryQueue {
    tx: mpsc::UnboundedSender<SettlementJob>,
    rx: Mutex<mpsc::UnboundedReceiver<SettlementJob>>,
    stats: Arc<QueueStats>,
}

impl MemoryQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Delivery accounting handle.
    #[must_use]
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

struct MemoryAcker {
    stats: Arc<QueueStats>,
}

impl Acker for MemoryAcker {
    fn settle(&mut self, outcome: AckOutcome) {
        match outcome {
            AckOutcome::Ack => self.stats.acked.fetch_add(1, Ordering::SeqCst),
            AckOutcome::Nack => self.stats.nacked.fetch_add(1, Ordering::SeqCst),
        };
    }
}

#[async_trait::async_trait]
impl SettlementQueue for MemoryQueue {
    async fn publish(&self, job: SettlementJob) -> Result<()> {
        self.tx
            .send(job)
            .map_err(|e| QueueError::Publish(e.to_string()))?;
        self.stats.published.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(job) => Ok(Some(Delivery::new(
                job,
                Box::new(MemoryAcker {
                    stats: Arc::clone(&self.stats),
                }),
            ))),
            None => Ok(None),
        }
    }
}
