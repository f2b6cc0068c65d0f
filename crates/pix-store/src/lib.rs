//! Storage layer for pix-bank.
//!
//! The service treats persistence as an external collaborator and talks to it
//! only through the [`Store`] trait: point lookups by id, an atomic
//! token-bucket consumption, and an atomic multi-row settlement unit. The
//! in-memory backend ([`MemoryStore`]) backs the service binary and every
//! test; durable backends plug in behind the same trait.
//!
//! # Atomicity contract
//!
//! Two operations carry the correctness of the whole system and MUST be
//! single atomic units in any backend:
//!
//! - [`Store::consume_token`]: a lost update here would let a user spend
//!   fewer tokens than their failures cost.
//! - [`Store::commit_settlement`]: the balance re-check, both balance
//!   mutations, and the status flip happen together or not at all. Backends
//!   without serializable isolation must take row locks on both account rows;
//!   otherwise two settlements draining the same sender can jointly overdraw.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};

use pix_core::{Account, AccountId, AccountKey, Transaction, TransactionId, User, UserId};

/// The storage trait defining all database operations.
pub trait Store: Send + Sync {
    // =========================================================================
    // Users
    // =========================================================================

    /// Insert or update a user record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn put_user(&self, user: &User) -> Result<()>;

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Atomically spend one rate-limit token at `now` and return the updated
    /// user. Accrued refills are folded in before the decrement.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    fn consume_token(&self, id: &UserId, now: DateTime<Utc>) -> Result<User>;

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Insert or update an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn put_account(&self, account: &Account) -> Result<()>;

    /// Get an account by id (including soft-deleted ones).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn get_account(&self, id: &AccountId) -> Result<Option<Account>>;

    /// Get the active account owned by a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn get_account_by_user(&self, user_id: &UserId) -> Result<Option<Account>>;

    /// Soft-delete an account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn soft_delete_account(&self, id: &AccountId, now: DateTime<Utc>) -> Result<()>;

    // =========================================================================
    // PIX keys
    // =========================================================================

    /// Register a PIX key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateKey` if an active key with the same
    /// value already exists.
    fn put_account_key(&self, key: &AccountKey) -> Result<()>;

    /// Resolve an active PIX key to its record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn get_account_key(&self, key: &str) -> Result<Option<AccountKey>>;

    /// List a user's active PIX keys (via their account).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn list_account_keys_by_user(&self, user_id: &UserId) -> Result<Vec<AccountKey>>;

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Insert a transaction record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn put_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Get a transaction by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>>;

    /// List transactions touching an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn list_transactions_by_account(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>>;

    // =========================================================================
    // Settlement
    // =========================================================================

    /// Atomically settle a pending transfer: re-validate both accounts and
    /// the sender balance against live state, debit the sender, credit the
    /// receiver, and flip the transaction to `Approved`. All of it happens in
    /// one unit; on any error nothing is applied.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the transaction or either account is
    ///   missing or soft-deleted
    /// - `StoreError::NotPending` if the transaction already reached a
    ///   terminal state (redelivered message after a committed attempt)
    /// - `StoreError::InsufficientFunds` if the balance moved since admission
    fn commit_settlement(&self, transaction_id: &TransactionId) -> Result<Transaction>;

    /// Flip a pending transaction to `Rejected`. Terminal states are left
    /// untouched; the current record is returned either way.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the transaction doesn't exist.
    fn reject_transaction(&self, id: &TransactionId) -> Result<Transaction>;
}
