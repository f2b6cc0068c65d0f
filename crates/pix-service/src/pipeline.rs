//! Transaction admission pipeline.
//!
//! Admission is optimistic: validate against live balances, insert a
//! `Pending` ledger row without touching balances, publish the settlement
//! job, and hand the transaction id back to the caller. The balance mutation
//! happens later in the settlement consumer, which re-runs this validation
//! against whatever the state is by then.

use std::sync::Arc;

use pix_core::{Account, AccountId, DomainError, Transaction, TransactionId, UserId};
use pix_queue::{SettlementJob, SettlementQueue};
use pix_store::Store;

/// How the caller names the receiving account.
#[derive(Debug, Clone)]
pub enum ReceiverRef {
    /// A PIX key alias (the preferred shape).
    Key(String),
    /// A direct account id.
    Id(AccountId),
}

/// Validates, records, and enqueues transfers.
pub struct TransactionPipeline {
    store: Arc<dyn Store>,
    queue: Arc<dyn SettlementQueue>,
}

impl TransactionPipeline {
    /// Create a pipeline over the given collaborators.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, queue: Arc<dyn SettlementQueue>) -> Self {
        Self { store, queue }
    }

    /// Resolve the receiver reference to an active account.
    fn resolve_receiver(&self, receiver: &ReceiverRef) -> Result<Account, DomainError> {
        let account = match receiver {
            ReceiverRef::Key(key) => {
                let record = self
                    .store
                    .get_account_key(key)
                    .map_err(|e| DomainError::Storage(e.to_string()))?
                    .ok_or_else(|| DomainError::NotFound {
                        entity: "account key",
                        id: key.clone(),
                    })?;
                self.store
                    .get_account(&record.account_id)
                    .map_err(|e| DomainError::Storage(e.to_string()))?
            }
            ReceiverRef::Id(id) => self
                .store
                .get_account(id)
                .map_err(|e| DomainError::Storage(e.to_string()))?,
        };

        account
            .filter(Account::is_active)
            .ok_or_else(|| DomainError::NotFound {
                entity: "receiver account",
                id: match receiver {
                    ReceiverRef::Key(key) => key.clone(),
                    ReceiverRef::Id(id) => id.to_string(),
                },
            })
    }

    /// Admission-time validation: sender active and owned by the caller,
    /// receiver resolvable and distinct, amount positive and covered.
    ///
    /// # Errors
    ///
    /// `InvalidInput`, `NotFound`, `Conflict`, or `InsufficientFunds`; all
    /// client-caused and token-consuming.
    pub fn validate(
        &self,
        caller: &UserId,
        sender_id: &AccountId,
        receiver: &ReceiverRef,
        amount: i64,
    ) -> Result<(Account, Account), DomainError> {
        if amount <= 0 {
            return Err(DomainError::InvalidInput(
                "amount must be a positive integer in cents".into(),
            ));
        }

        let sender = self
            .store
            .get_account(sender_id)
            .map_err(|e| DomainError::Storage(e.to_string()))?
            .filter(Account::is_active)
            .ok_or_else(|| DomainError::NotFound {
                entity: "sender account",
                id: sender_id.to_string(),
            })?;

        if sender.user_id != *caller {
            // Callers may only send from their own account.
            return Err(DomainError::NotFound {
                entity: "sender account",
                id: sender_id.to_string(),
            });
        }

        let receiver = self.resolve_receiver(receiver)?;

        if sender.id == receiver.id {
            return Err(DomainError::Conflict(
                "sender and receiver are the same account".into(),
            ));
        }

        if !sender.has_sufficient_balance(amount) {
            return Err(DomainError::InsufficientFunds {
                balance: sender.balance,
                required: amount,
            });
        }

        Ok((sender, receiver))
    }

    /// Validate, create the `Pending` row, and publish the settlement job.
    ///
    /// Balances are untouched here. If the publish fails the pending row is
    /// left orphaned and the caller gets a server-side error; no token is
    /// consumed for it.
    ///
    /// # Errors
    ///
    /// Validation errors as in [`Self::validate`], plus `QueuePublish` and
    /// `Storage` for infrastructure failures.
    pub async fn submit(
        &self,
        caller: &UserId,
        sender_id: &AccountId,
        receiver: &ReceiverRef,
        amount: i64,
    ) -> Result<Transaction, DomainError> {
        let (sender, receiver) = self.validate(caller, sender_id, receiver, amount)?;

        let transaction = Transaction::pending(sender.id, receiver.id, amount);
        self.store
            .put_transaction(&transaction)
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        let job = SettlementJob {
            transaction_id: transaction.id,
            sender_account_id: sender.id,
            receiver_account_id: receiver.id,
            amount,
        };
        if let Err(e) = self.queue.publish(job).await {
            tracing::error!(
                transaction_id = %transaction.id,
                error = %e,
                "settlement publish failed; pending transaction orphaned"
            );
            return Err(DomainError::QueuePublish(e.to_string()));
        }

        tracing::info!(
            transaction_id = %transaction.id,
            sender = %sender.id,
            receiver = %receiver.id,
            amount,
            "transaction admitted and queued"
        );
        Ok(transaction)
    }

    /// Current status of a transaction.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids, `Storage` on backend failure.
    pub fn status_of(&self, id: &TransactionId) -> Result<Transaction, DomainError> {
        self.store
            .get_transaction(id)
            .map_err(|e| DomainError::Storage(e.to_string()))?
            .ok_or_else(|| DomainError::NotFound {
                entity: "transaction",
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pix_core::{AccountKey, TransactionStatus, User};
    use pix_queue::MemoryQueue;
    use pix_store::MemoryStore;

    struct Fixture {
        pipeline: TransactionPipeline,
        store: Arc<MemoryStore>,
        queue: Arc<MemoryQueue>,
        sender_user: UserId,
        sender: AccountId,
        receiver: AccountId,
    }

    fn fixture(sender_balance: i64) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryQueue::new());

        let sender_owner = User::new("Ana".into(), "ana@example.com".into());
        let receiver_owner = User::new("Rui".into(), "rui@example.com".into());
        store.put_user(&sender_owner).unwrap();
        store.put_user(&receiver_owner).unwrap();

        let sender = Account::new(sender_owner.id, sender_balance);
        let receiver = Account::new(receiver_owner.id, 0);
        store.put_account(&sender).unwrap();
        store.put_account(&receiver).unwrap();
        store
            .put_account_key(&AccountKey::new("rui@pix".into(), receiver.id))
            .unwrap();

        Fixture {
            pipeline: TransactionPipeline::new(
                Arc::clone(&store) as Arc<dyn Store>,
                Arc::clone(&queue) as Arc<dyn SettlementQueue>,
            ),
            store,
            queue,
            sender_user: sender_owner.id,
            sender: sender.id,
            receiver: receiver.id,
        }
    }

    #[tokio::test]
    async fn submit_creates_pending_and_publishes() {
        let f = fixture(10_000);
        let tx = f
            .pipeline
            .submit(
                &f.sender_user,
                &f.sender,
                &ReceiverRef::Key("rui@pix".into()),
                5_000,
            )
            .await
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.receiver_account_id, f.receiver);
        // Balances untouched at admission time.
        assert_eq!(f.store.get_account(&f.sender).unwrap().unwrap().balance, 10_000);
        assert_eq!(f.queue.stats().published(), 1);
    }

    #[tokio::test]
    async fn insufficient_balance_fails_before_any_side_effect() {
        let f = fixture(100);
        let err = f
            .pipeline
            .submit(
                &f.sender_user,
                &f.sender,
                &ReceiverRef::Key("rui@pix".into()),
                5_000,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InsufficientFunds { .. }));
        assert_eq!(f.queue.stats().published(), 0);
        assert!(f
            .store
            .list_transactions_by_account(&f.sender, 10, 0)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unknown_receiver_key_fails_with_not_found() {
        let f = fixture(10_000);
        let err = f
            .pipeline
            .submit(
                &f.sender_user,
                &f.sender,
                &ReceiverRef::Key("nobody@pix".into()),
                5_000,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound { .. }));
        assert_eq!(f.queue.stats().published(), 0);
    }

    #[tokio::test]
    async fn self_transfer_is_a_conflict() {
        let f = fixture(10_000);
        let err = f
            .pipeline
            .submit(
                &f.sender_user,
                &f.sender,
                &ReceiverRef::Id(f.sender),
                1_000,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn non_positive_amount_is_invalid_input() {
        let f = fixture(10_000);
        for amount in [0, -500] {
            let err = f
                .pipeline
                .validate(
                    &f.sender_user,
                    &f.sender,
                    &ReceiverRef::Key("rui@pix".into()),
                    amount,
                )
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn foreign_sender_account_is_not_found() {
        let f = fixture(10_000);
        let stranger = UserId::generate();
        let err = f
            .pipeline
            .validate(
                &stranger,
                &f.sender,
                &ReceiverRef::Key("rui@pix".into()),
                1_000,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn deleted_receiver_account_is_not_found() {
        let f = fixture(10_000);
        f.store
            .soft_delete_account(&f.receiver, chrono::Utc::now())
            .unwrap();
        let err = f
            .pipeline
            .validate(
                &f.sender_user,
                &f.sender,
                &ReceiverRef::Key("rui@pix".into()),
                1_000,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn status_of_unknown_transaction_is_not_found() {
        let f = fixture(10_000);
        let err = f.pipeline.status_of(&TransactionId::generate()).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
