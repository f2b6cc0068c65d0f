//! Settlement consumer.
//!
//! Drains the settlement queue with competing consumers. Every delivery is
//! re-validated against live state inside the store's atomic settlement unit;
//! the producer-time snapshot is never trusted. Outcomes:
//!
//! - commit succeeded: transaction `Approved`, message acked
//! - re-validation failed (balance moved, account deleted, already terminal):
//!   transaction `Rejected` if still pending, message nacked without requeue
//! - unexpected backend failure: transaction left `Pending` for operator
//!   intervention, message nacked without requeue
//!
//! At-least-once delivery is safe purely because settlement is conditioned on
//! the fresh re-validation: a redelivered job whose first attempt committed
//! fails the still-pending check and is dropped without double-applying.

use std::sync::Arc;

use pix_core::Transaction;
use pix_queue::{Delivery, SettlementJob, SettlementQueue};
use pix_store::{Store, StoreError};

/// What processing one job concluded.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Balances moved, transaction approved.
    Committed(Transaction),
    /// Re-validation failed; transaction rejected (or already terminal).
    Rejected,
    /// Backend failure; transaction left pending.
    Abandoned,
}

/// Consumes settlement jobs and applies balance mutations.
pub struct SettlementConsumer {
    store: Arc<dyn Store>,
    queue: Arc<dyn SettlementQueue>,
}

impl SettlementConsumer {
    /// Create a consumer over the given collaborators.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, queue: Arc<dyn SettlementQueue>) -> Self {
        Self { store, queue }
    }

    /// Drain the queue until it closes. Run one task per competing consumer.
    pub async fn run(self) {
        loop {
            match self.queue.receive().await {
                Ok(Some(delivery)) => self.handle(delivery),
                Ok(None) => {
                    tracing::info!("settlement queue closed, consumer stopping");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "settlement receive failed, consumer stopping");
                    break;
                }
            }
        }
    }

    /// Process a single delivery and settle it with the broker.
    pub fn handle(&self, delivery: Delivery) {
        match self.process(&delivery.job) {
            ProcessOutcome::Committed(tx) => {
                tracing::info!(
                    transaction_id = %tx.id,
                    amount = tx.amount,
                    "settlement committed"
                );
                delivery.ack();
            }
            ProcessOutcome::Rejected => {
                tracing::warn!(
                    transaction_id = %delivery.job.transaction_id,
                    "settlement rejected by re-validation"
                );
                delivery.nack();
            }
            ProcessOutcome::Abandoned => {
                tracing::error!(
                    transaction_id = %delivery.job.transaction_id,
                    "settlement abandoned, transaction left pending"
                );
                delivery.nack();
            }
        }
    }

    /// Re-validate and commit one job.
    #[must_use]
    pub fn process(&self, job: &SettlementJob) -> ProcessOutcome {
        match self.store.commit_settlement(&job.transaction_id) {
            Ok(tx) => ProcessOutcome::Committed(tx),
            Err(
                err @ (StoreError::NotFound { .. }
                | StoreError::InsufficientFunds { .. }
                | StoreError::NotPending { .. }),
            ) => {
                tracing::debug!(
                    transaction_id = %job.transaction_id,
                    error = %err,
                    "settlement re-validation failed"
                );
                // Terminal statuses are never overwritten by the reject.
                if let Err(e) = self.store.reject_transaction(&job.transaction_id) {
                    tracing::warn!(
                        transaction_id = %job.transaction_id,
                        error = %e,
                        "could not mark transaction rejected"
                    );
                }
                ProcessOutcome::Rejected
            }
            Err(err @ StoreError::DuplicateKey { .. } | err @ StoreError::Database(_)) => {
                tracing::error!(
                    transaction_id = %job.transaction_id,
                    error = %err,
                    "settlement backend failure"
                );
                ProcessOutcome::Abandoned
            }
        }
    }
}
