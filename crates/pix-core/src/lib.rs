//! Core domain types for pix-bank.
//!
//! This crate holds the pure domain model shared by the storage layer, the
//! settlement queue, and the HTTP service:
//!
//! - Strongly-typed identifiers ([`UserId`], [`AccountId`], [`TransactionId`])
//! - The per-user token bucket and its replenishment math ([`TokenBucket`])
//! - Accounts, PIX keys, and transactions
//! - The closed domain-error taxonomy ([`DomainError`])
//!
//! Nothing here performs I/O; every function is a pure projection over its
//! inputs so the invariants can be tested without a store or a queue.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod bucket;
pub mod error;
pub mod ids;
pub mod transaction;
pub mod user;

pub use account::{Account, AccountKey};
pub use bucket::{TokenBucket, BUCKET_CAPACITY, REFILL_INTERVAL_SECS};
pub use error::{DomainError, Result};
pub use ids::{AccountId, AccountKeyId, IdError, TransactionId, UserId};
pub use transaction::{Transaction, TransactionStatus};
pub use user::User;
