//! Ledger transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, TransactionId};

/// Lifecycle status of a transfer.
///
/// A transaction is created `Pending`, moved to exactly one terminal state by
/// the settlement consumer, and is immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Created and queued; balances untouched.
    Pending,

    /// Settled: balances were moved.
    Approved,

    /// Settlement re-validation failed; balances were never moved.
    Rejected,
}

impl TransactionStatus {
    /// Whether the status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A transfer between two accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// The transaction id (ULID, time-ordered).
    pub id: TransactionId,

    /// Amount in cents. Always positive.
    pub amount: i64,

    /// Debited account.
    pub sender_account_id: AccountId,

    /// Credited account.
    pub receiver_account_id: AccountId,

    /// Current status.
    pub status: TransactionStatus,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new pending transfer.
    #[must_use]
    pub fn pending(sender: AccountId, receiver: AccountId, amount: i64) -> Self {
        Self {
            id: TransactionId::generate(),
            amount,
            sender_account_id: sender,
            receiver_account_id: receiver,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
