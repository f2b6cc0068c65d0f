//! Identifier types for pix-bank.
//!
//! Users, accounts, and PIX key records use random UUIDs. Transactions use
//! ULIDs so ledger entries sort chronologically by id, which keeps
//! per-account listings a natural range scan in ordered backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,
}

/// Declares a newtype identifier over `$inner` that behaves like a string on
/// the wire: serde goes through `TryFrom<String>`/`Into<String>`, `FromStr`
/// maps parse failures to `$err`, and `Display`/`Debug` render the inner
/// value.
macro_rules! string_id {
    ($name:ident, $inner:ty, $err:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name($inner);

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<$inner>().map(Self).map_err(|_| $err)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

string_id!(
    UserId,
    uuid::Uuid,
    IdError::InvalidUuid,
    "A user identifier.\n\nSupplied per request by the authentication collaborator as an opaque, already-verified id."
);
string_id!(AccountId, uuid::Uuid, IdError::InvalidUuid, "A bank account identifier.");
string_id!(AccountKeyId, uuid::Uuid, IdError::InvalidUuid, "A PIX key record identifier.");
string_id!(
    TransactionId,
    Ulid,
    IdError::InvalidUlid,
    "A transaction identifier.\n\nULID-backed, so ids sort chronologically."
);

impl UserId {
    /// Generate a new random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl AccountId {
    /// Generate a new random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl AccountKeyId {
    /// Generate a new random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl TransactionId {
    /// Generate a new id stamped with the current time.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}
