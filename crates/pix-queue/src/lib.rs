//! Settlement queue abstraction for pix-bank.
//!
//! The durable broker is an external collaborator; the service talks to it
//! through [`SettlementQueue`], which models the semantics the pipeline
//! relies on:
//!
//! - durable publish of one [`SettlementJob`] per pending transaction
//! - competing-consumer, at-least-once delivery
//! - explicit ack / nack-without-requeue on every [`Delivery`]
//!
//! The in-memory broker ([`MemoryQueue`]) backs the service binary and the
//! tests. At-least-once safety comes from the consumer re-validating against
//! live balances on every delivery, not from deduplication, so redelivering
//! a job is always harmless.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod memory;

pub use memory::MemoryQueue;

use serde::{Deserialize, Serialize};

use pix_core::{AccountId, TransactionId};

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors that can occur talking to the broker.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Publishing a job failed.
    #[error("publish failed: {0}")]
    Publish(String),

    /// The queue was shut down.
    #[error("queue closed")]
    Closed,
}

/// A queued settlement job.
///
/// Carries everything the consumer needs to re-run admission-time validation
/// against live state; the producer-time balance snapshot is never trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementJob {
    /// The pending transaction to settle.
    pub transaction_id: TransactionId,

    /// Debited account.
    pub sender_account_id: AccountId,

    /// Credited account (already resolved from the PIX key at admission).
    pub receiver_account_id: AccountId,

    /// Amount in cents.
    pub amount: i64,
}

/// The settlement queue collaborator.
#[async_trait::async_trait]
pub trait SettlementQueue: Send + Sync {
    /// Publish one job. Durable once this returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Publish` if the broker rejects the message; the
    /// caller must surface this as a server-side failure.
    async fn publish(&self, job: SettlementJob) -> Result<()>;

    /// Wait for the next delivery. Each message goes to exactly one consumer.
    ///
    /// Returns `None` once the queue is closed and drained.
    ///
    /// # Errors
    ///
    /// Returns an error if the broker connection fails.
    async fn receive(&self) -> Result<Option<Delivery>>;
}

/// Acknowledgement outcome for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Processing committed; the broker may forget the message.
    Ack,
    /// Processing failed permanently; drop the message without requeue.
    Nack,
}

/// Backend hook that records the outcome of a delivery.
pub trait Acker: Send {
    /// Record the outcome with the broker.
    fn settle(&mut self, outcome: AckOutcome);
}

/// A message handed to exactly one consumer.
///
/// Every delivery must be explicitly acked or nacked; dropping one unsettled
/// is logged, since a real broker would redeliver it.
pub struct Delivery {
    /// The job payload.
    pub job: SettlementJob,
    acker: Box<dyn Acker>,
    settled: bool,
}

impl Delivery {
    /// Wrap a job with its backend acknowledgement hook.
    #[must_use]
    pub fn new(job: SettlementJob, acker: Box<dyn Acker>) -> Self {
        Self {
            job,
            acker,
            settled: false,
        }
    }

    /// Acknowledge successful processing.
    pub fn ack(mut self) {
        self.settled = true;
        self.acker.settle(AckOutcome::Ack);
    }

    /// Negatively acknowledge without requeue (single-shot processing).
    pub fn nack(mut self) {
        self.settled = true;
        self.acker.settle(AckOutcome::Nack);
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(
                transaction_id = %self.job.transaction_id,
                "delivery dropped without ack/nack; a durable broker would redeliver it"
            );
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("job", &self.job)
            .field("settled", &self.settled)
            .finish_non_exhaustive()
    }
}
