//! User records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bucket::TokenBucket;
use crate::UserId;

/// A registered user.
///
/// The admission-control bucket lives inside the user record; it is created
/// full and never deleted separately from the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The user id.
    pub id: UserId,

    /// Display name.
    pub name: String,

    /// Contact email.
    pub email: String,

    /// Rate-limit bucket state.
    pub bucket: TokenBucket,

    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a full token bucket.
    #[must_use]
    pub fn new(name: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            name,
            email,
            bucket: TokenBucket::full(now),
            created_at: now,
        }
    }
}
