//! Domain error taxonomy.
//!
//! Failures are a closed enum so the admission interceptor can classify them
//! structurally instead of matching on status codes or error-name strings.
//! [`DomainError::consumes_token`] is the single source of truth for which
//! failures cost the caller a rate-limit token.

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Errors produced by the transaction pipeline and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// A referenced user, account, key, or transaction does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"account"`.
        entity: &'static str,
        /// The id or key that failed to resolve.
        id: String,
    },

    /// The request itself is malformed (non-positive amount, missing fields).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The request conflicts with current state (self-transfer, duplicate key).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The sender's balance does not cover the transfer.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance in cents.
        balance: i64,
        /// Requested amount in cents.
        required: i64,
    },

    /// The caller's token bucket is exhausted.
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the next token refills.
        retry_after_secs: i64,
    },

    /// Publishing the settlement job failed.
    #[error("queue publish failed: {0}")]
    QueuePublish(String),

    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    /// Whether this failure is client-caused and therefore spends one
    /// rate-limit token ("pay per rejected request, not per successful one").
    ///
    /// Infrastructure failures never consume a token, and `RateLimited`
    /// itself does not: the gate denies before the handler runs.
    #[must_use]
    pub const fn consumes_token(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidInput(_)
                | Self::Conflict(_)
                | Self::InsufficientFunds { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_caused_errors_consume_a_token() {
        assert!(DomainError::NotFound {
            entity: "account",
            id: "x".into()
        }
        .consumes_token());
        assert!(DomainError::InvalidInput("amount must be positive".into()).consumes_token());
        assert!(DomainError::Conflict("self transfer".into()).consumes_token());
        assert!(DomainError::InsufficientFunds {
            balance: 100,
            required: 5000
        }
        .consumes_token());
    }

    #[test]
    fn infrastructure_errors_do_not_consume_a_token() {
        assert!(!DomainError::QueuePublish("broker down".into()).consumes_token());
        assert!(!DomainError::Storage("unavailable".into()).consumes_token());
        assert!(!DomainError::RateLimited {
            retry_after_secs: 3600
        }
        .consumes_token());
    }
}
