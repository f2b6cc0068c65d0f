//! Error types for pix-bank storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"account"`.
        entity: &'static str,
        /// The id that failed to resolve.
        id: String,
    },

    /// A PIX key with the same value already exists.
    #[error("duplicate key: {key}")]
    DuplicateKey {
        /// The conflicting key value.
        key: String,
    },

    /// The sender's balance does not cover the debit.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance in cents.
        balance: i64,
        /// Required amount in cents.
        required: i64,
    },

    /// The transaction is no longer pending; terminal states are immutable.
    #[error("transaction {id} is not pending")]
    NotPending {
        /// The transaction id.
        id: String,
    },

    /// Backend failure (lock poisoning, I/O, ...).
    #[error("database error: {0}")]
    Database(String),
}
