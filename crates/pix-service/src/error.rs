//! API error types and responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use pix_core::DomainError;
use pix_store::StoreError;

/// Marker attached to error responses so the rate-limit interceptor can
/// classify the outcome structurally instead of sniffing status codes.
#[derive(Debug, Clone, Copy)]
pub struct ErrorClass {
    /// Whether the failure is client-caused and spends one bucket token.
    pub consumes_token: bool,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - known caller, denied operation (or unknown bucket owner).
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Insufficient balance for the transfer (422).
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance in cents.
        balance: i64,
        /// Requested amount in cents.
        required: i64,
    },

    /// Token bucket exhausted (429).
    #[error("rate limit exceeded")]
    RateLimited {
        /// Seconds until the next token refills.
        retry_after_secs: i64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Whether this failure costs the caller a rate-limit token.
    #[must_use]
    pub const fn consumes_token(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::BadRequest(_)
                | Self::Conflict(_)
                | Self::InsufficientFunds { .. }
        )
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// RFC 7807-style body carried by every 429.
#[derive(Debug, Serialize)]
pub struct RateLimitProblem {
    /// Problem type URI.
    pub r#type: &'static str,
    /// Short human-readable title.
    pub title: &'static str,
    /// HTTP status.
    pub status: u16,
    /// Explanation and retry hint.
    pub detail: &'static str,
}

impl RateLimitProblem {
    /// The problem document for an exhausted bucket.
    #[must_use]
    pub const fn exhausted() -> Self {
        Self {
            r#type: "/errors/rate-limit",
            title: "Too Many Requests",
            status: 429,
            detail: "Request limit exceeded. Try again later.",
        }
    }
}

/// Build the full 429 response: status, `Retry-After`, problem body.
#[must_use]
pub fn rate_limited_response(retry_after_secs: i64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitProblem::exhausted()),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
        .extensions_mut()
        .insert(ErrorClass {
            consumes_token: false,
        });
    response
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::RateLimited { retry_after_secs } = self {
            return rate_limited_response(retry_after_secs);
        }

        let consumes_token = self.consumes_token();
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientFunds { balance, required } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_balance",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::RateLimited { .. } => unreachable!("handled above"),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(ErrorClass { consumes_token });
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            DomainError::InvalidInput(msg) => Self::BadRequest(msg),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            DomainError::RateLimited { retry_after_secs } => Self::RateLimited { retry_after_secs },
            DomainError::QueuePublish(msg) | DomainError::Storage(msg) => Self::Internal(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::DuplicateKey { key } => Self::Conflict(format!("key already registered: {key}")),
            StoreError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            StoreError::NotPending { id } => {
                Self::Conflict(format!("transaction {id} already settled"))
            }
            StoreError::Database(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_consume_token() {
        assert!(ApiError::NotFound("x".into()).consumes_token());
        assert!(ApiError::BadRequest("x".into()).consumes_token());
        assert!(ApiError::Conflict("x".into()).consumes_token());
        assert!(ApiError::InsufficientFunds {
            balance: 1,
            required: 2
        }
        .consumes_token());
    }

    #[test]
    fn server_errors_do_not_consume_token() {
        assert!(!ApiError::Internal("x".into()).consumes_token());
        assert!(!ApiError::Unauthorized.consumes_token());
        assert!(!ApiError::Forbidden.consumes_token());
        assert!(!ApiError::RateLimited {
            retry_after_secs: 10
        }
        .consumes_token());
    }

    #[test]
    fn responses_carry_error_class_extension() {
        let response = ApiError::NotFound("account".into()).into_response();
        let class = response.extensions().get::<ErrorClass>().unwrap();
        assert!(class.consumes_token);

        let response = ApiError::Internal("boom".into()).into_response();
        let class = response.extensions().get::<ErrorClass>().unwrap();
        assert!(!class.consumes_token);
    }

    #[test]
    fn rate_limited_response_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after_secs: 3600,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            "3600"
        );
    }
}
