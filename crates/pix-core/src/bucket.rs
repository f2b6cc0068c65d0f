//! Per-user token bucket for transaction admission control.
//!
//! Every user carries a bucket of up to [`BUCKET_CAPACITY`] tokens. A token is
//! spent only on qualifying (client-caused) failures, and one token refills
//! every hour, measured from the last consumption. The effective count is
//! always a read-time projection over the stored `(token_count,
//! last_consumed_at)` pair; nothing ever persists the projected value.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of tokens a bucket can hold.
pub const BUCKET_CAPACITY: i64 = 10;

/// Seconds until one token is refilled after a consumption.
pub const REFILL_INTERVAL_SECS: i64 = 3600;

/// Persisted bucket state, embedded in the user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBucket {
    /// Tokens currently stored. Kept in `0..=BUCKET_CAPACITY`.
    pub token_count: i64,

    /// When a token was last spent. Refill is measured from this instant.
    pub last_consumed_at: DateTime<Utc>,
}

impl TokenBucket {
    /// Create a full bucket, as assigned at user creation.
    #[must_use]
    pub fn full(now: DateTime<Utc>) -> Self {
        Self {
            token_count: BUCKET_CAPACITY,
            last_consumed_at: now,
        }
    }

    /// Effective token count at `now`: the stored count plus one token per
    /// whole elapsed hour, clamped to [`BUCKET_CAPACITY`].
    #[must_use]
    pub fn effective_tokens(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = now.signed_duration_since(self.last_consumed_at);
        let accrued = (elapsed.num_seconds() / REFILL_INTERVAL_SECS).max(0);
        (self.token_count + accrued).min(BUCKET_CAPACITY)
    }

    /// Seconds until the next token refills, clamped at zero.
    #[must_use]
    pub fn seconds_until_next_token(&self, now: DateTime<Utc>) -> i64 {
        let next = self.last_consumed_at + Duration::seconds(REFILL_INTERVAL_SECS);
        next.signed_duration_since(now).num_seconds().max(0)
    }

    /// Spend one token at `now`, returning the post-consumption state.
    ///
    /// Accrued refills are folded into the stored count before the decrement,
    /// so a bucket that sat idle does not lose the tokens it earned. The
    /// result is clamped at zero and the refill clock restarts at `now`.
    #[must_use]
    pub fn consume(&self, now: DateTime<Utc>) -> Self {
        Self {
            token_count: (self.effective_tokens(now) - 1).max(0),
            last_consumed_at: now,
        }
    }
}
