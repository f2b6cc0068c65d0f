//! Bank accounts and PIX keys.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{AccountId, AccountKeyId, UserId};

/// A bank account holding a balance in minor currency units (cents).
///
/// Balances are integers; no floating point anywhere in the money path.
/// Deletion is soft: a `deleted_at` timestamp marks the account inactive
/// while the row stays referencable from the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The account id.
    pub id: AccountId,

    /// Human-facing 6-digit account number. Uniqueness is best-effort.
    pub account_number: String,

    /// Current balance in cents.
    pub balance: i64,

    /// Owning user. One active account per user.
    pub user_id: UserId,

    /// Soft-delete marker; `Some` means the account is inactive.
    pub deleted_at: Option<DateTime<Utc>>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new active account with the given opening balance.
    #[must_use]
    pub fn new(user_id: UserId, opening_balance: i64) -> Self {
        Self {
            id: AccountId::generate(),
            account_number: generate_account_number(),
            balance: opening_balance,
            user_id,
            deleted_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the account is active (not soft-deleted).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Check if the balance covers a debit of `amount` cents.
    #[must_use]
    pub fn has_sufficient_balance(&self, amount: i64) -> bool {
        self.balance >= amount
    }
}

/// Generate a random 6-digit account number.
#[must_use]
pub fn generate_account_number() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// A PIX key: a globally-unique alias resolving to one active account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountKey {
    /// The key record id.
    pub id: AccountKeyId,

    /// The alias string (email, phone, random key...). Globally unique.
    pub key: String,

    /// The account this key resolves to.
    pub account_id: AccountId,

    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,

    /// When the key was registered.
    pub created_at: DateTime<Utc>,
}

impl AccountKey {
    /// Register a new key for an account.
    #[must_use]
    pub fn new(key: String, account_id: AccountId) -> Self {
        Self {
            id: AccountKeyId::generate(),
            key,
            account_id,
            deleted_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the key is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
