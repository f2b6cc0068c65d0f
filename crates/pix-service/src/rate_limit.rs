//! Leaky-bucket admission control.
//!
//! Two phases compose around the protected handler, independent of the web
//! framework:
//!
//! - [`LeakyBucket::before`] (the admission gate) is a read-only check: no
//!   identity fails open, an unknown user fails closed, an exhausted bucket
//!   is denied with a retry hint. Allowing a request never spends a token.
//! - [`LeakyBucket::after`] (the consumption interceptor) observes the
//!   outcome: qualifying (client-caused) failures atomically spend one token;
//!   successes and server-side failures never do. Rate-limit headers are
//!   computed from the freshest bucket state.
//!
//! When a consumption empties the bucket, the response is deterministically
//! replaced by a 429 carrying `Retry-After`; the original error is logged but
//! the 429 is what the client receives.
//!
//! [`leaky_bucket_middleware`] is the thin axum glue over the two phases.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, Response as HttpResponse, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};

use pix_core::{TokenBucket, UserId, BUCKET_CAPACITY};
use pix_store::{Store, StoreError};

use crate::auth::RequestContext;
use crate::error::{rate_limited_response, ApiError, ErrorClass};
use crate::state::AppState;

/// Admission decision for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Proceed to the handler.
    Allow,
    /// The resolved identity has no user record; fail closed.
    DenyUnknownUser,
    /// The bucket is empty.
    DenyExhausted {
        /// Seconds until one token refills.
        retry_after_secs: i64,
    },
}

/// How the protected operation ended, as seen by the interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The handler succeeded.
    Success,
    /// The handler failed.
    Failure {
        /// Whether the failure is client-caused and spends a token.
        consumes_token: bool,
    },
}

/// Values for the standard rate-limit response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// `X-RateLimit-Limit`.
    pub limit: i64,
    /// `X-RateLimit-Remaining`, floored at zero.
    pub remaining: i64,
    /// `X-RateLimit-Reset` in seconds.
    pub reset_secs: i64,
}

impl RateLimitHeaders {
    fn from_bucket(bucket: &TokenBucket, now: DateTime<Utc>) -> Self {
        Self {
            limit: BUCKET_CAPACITY,
            remaining: bucket.effective_tokens(now).max(0),
            reset_secs: bucket.seconds_until_next_token(now),
        }
    }
}

/// What the interceptor wants done to the outgoing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMutation {
    /// Leave the response untouched.
    None,
    /// Attach rate-limit headers.
    Headers(RateLimitHeaders),
    /// Replace the response with a 429.
    RateLimited {
        /// Headers computed from the post-decrement state.
        headers: RateLimitHeaders,
        /// `Retry-After` seconds.
        retry_after_secs: i64,
    },
}

/// The two-phase leaky-bucket wrapper.
pub struct LeakyBucket {
    store: Arc<dyn Store>,
}

impl LeakyBucket {
    /// Create a wrapper over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Admission gate. Read-only; never consumes a token.
    ///
    /// # Errors
    ///
    /// Propagates storage failures; the caller treats them as server-side.
    pub fn before(&self, ctx: RequestContext, now: DateTime<Utc>) -> Result<Decision, StoreError> {
        let Some(user_id) = ctx.user_id else {
            // Unauthenticated/public route: fail open by design.
            return Ok(Decision::Allow);
        };

        let Some(user) = self.store.get_user(&user_id)? else {
            return Ok(Decision::DenyUnknownUser);
        };

        if user.bucket.effective_tokens(now) <= 0 {
            return Ok(Decision::DenyExhausted {
                retry_after_secs: user.bucket.seconds_until_next_token(now),
            });
        }

        Ok(Decision::Allow)
    }

    /// Consumption interceptor. Runs after the protected operation.
    ///
    /// # Errors
    ///
    /// Propagates storage failures; the caller must still surface the
    /// original outcome to the client.
    pub fn after(
        &self,
        ctx: RequestContext,
        outcome: RequestOutcome,
        now: DateTime<Utc>,
    ) -> Result<ResponseMutation, StoreError> {
        let Some(user_id) = ctx.user_id else {
            return Ok(ResponseMutation::None);
        };

        match outcome {
            RequestOutcome::Success => {
                let Some(user) = self.store.get_user(&user_id)? else {
                    return Ok(ResponseMutation::None);
                };
                Ok(ResponseMutation::Headers(RateLimitHeaders::from_bucket(
                    &user.bucket,
                    now,
                )))
            }
            RequestOutcome::Failure {
                consumes_token: false,
            } => Ok(ResponseMutation::None),
            RequestOutcome::Failure {
                consumes_token: true,
            } => {
                let user = self.store.consume_token(&user_id, now)?;
                let headers = RateLimitHeaders::from_bucket(&user.bucket, now);
                if user.bucket.effective_tokens(now) <= 0 {
                    tracing::info!(user_id = %user_id, "bucket exhausted by qualifying failure");
                    Ok(ResponseMutation::RateLimited {
                        headers,
                        retry_after_secs: user.bucket.seconds_until_next_token(now),
                    })
                } else {
                    Ok(ResponseMutation::Headers(headers))
                }
            }
        }
    }
}

/// Classify a response into a [`RequestOutcome`].
///
/// The typed [`ErrorClass`] extension wins when present; otherwise fall back
/// on the status code, treating framework-generated 4xx rejections (malformed
/// JSON and the like) as client-caused.
fn classify_response<B>(response: &HttpResponse<B>) -> RequestOutcome {
    if let Some(class) = response.extensions().get::<ErrorClass>() {
        return RequestOutcome::Failure {
            consumes_token: class.consumes_token,
        };
    }
    let status = response.status();
    if status.is_success() || status.is_redirection() || status.is_informational() {
        RequestOutcome::Success
    } else {
        RequestOutcome::Failure {
            consumes_token: matches!(
                status,
                StatusCode::BAD_REQUEST
                    | StatusCode::NOT_FOUND
                    | StatusCode::CONFLICT
                    | StatusCode::UNPROCESSABLE_ENTITY
            ),
        }
    }
}

fn insert_headers(response: &mut Response, headers: RateLimitHeaders) {
    let pairs = [
        ("x-ratelimit-limit", headers.limit),
        ("x-ratelimit-remaining", headers.remaining),
        ("x-ratelimit-reset", headers.reset_secs),
    ];
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
            response.headers_mut().insert(name, value);
        }
    }
}

/// Axum middleware applying the two phases around a protected route.
pub async fn leaky_bucket_middleware(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    req: Request,
    next: Next,
) -> Response {
    let limiter = LeakyBucket::new(Arc::clone(&state.store));

    match limiter.before(ctx, Utc::now()) {
        Ok(Decision::Allow) => {}
        Ok(Decision::DenyUnknownUser) => return ApiError::Forbidden.into_response(),
        Ok(Decision::DenyExhausted { retry_after_secs }) => {
            let mut response = rate_limited_response(retry_after_secs);
            insert_headers(
                &mut response,
                RateLimitHeaders {
                    limit: BUCKET_CAPACITY,
                    remaining: 0,
                    reset_secs: retry_after_secs,
                },
            );
            return response;
        }
        Err(e) => {
            tracing::error!(error = %e, "admission gate storage failure");
            return ApiError::Internal(e.to_string()).into_response();
        }
    }

    let mut response = next.run(req).await;

    let outcome = classify_response(&response);
    match limiter.after(ctx, outcome, Utc::now()) {
        Ok(ResponseMutation::None) => response,
        Ok(ResponseMutation::Headers(headers)) => {
            insert_headers(&mut response, headers);
            response
        }
        Ok(ResponseMutation::RateLimited {
            headers,
            retry_after_secs,
        }) => {
            tracing::info!(
                original_status = %response.status(),
                "overriding response with 429, bucket exhausted"
            );
            let mut replaced = rate_limited_response(retry_after_secs);
            insert_headers(&mut replaced, headers);
            replaced
        }
        Err(e) => {
            // The original outcome must reach the client even when the
            // bucket update fails.
            tracing::warn!(error = %e, "token consumption failed, passing original response");
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pix_core::User;
    use pix_store::MemoryStore;

    fn limiter_with_user(token_count: i64, last_consumed_hours_ago: i64) -> (LeakyBucket, UserId) {
        let store = Arc::new(MemoryStore::new());
        let mut user = User::new("Ana".into(), "ana@example.com".into());
        user.bucket.token_count = token_count;
        user.bucket.last_consumed_at = Utc::now() - Duration::hours(last_consumed_hours_ago);
        store.put_user(&user).unwrap();
        (LeakyBucket::new(store), user.id)
    }

    fn ctx(user_id: UserId) -> RequestContext {
        RequestContext {
            user_id: Some(user_id),
        }
    }

    #[test]
    fn before_allows_anonymous_requests() {
        let (limiter, _) = limiter_with_user(0, 0);
        let decision = limiter.before(RequestContext::default(), Utc::now()).unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn before_denies_unknown_user() {
        let (limiter, _) = limiter_with_user(5, 0);
        let decision = limiter.before(ctx(UserId::generate()), Utc::now()).unwrap();
        assert_eq!(decision, Decision::DenyUnknownUser);
    }

    #[test]
    fn before_denies_exhausted_bucket_with_retry_hint() {
        let (limiter, user_id) = limiter_with_user(0, 0);
        match limiter.before(ctx(user_id), Utc::now()).unwrap() {
            Decision::DenyExhausted { retry_after_secs } => {
                assert!(retry_after_secs > 3590 && retry_after_secs <= 3600);
            }
            other => panic!("expected DenyExhausted, got {other:?}"),
        }
    }

    #[test]
    fn before_allows_when_refill_accrued() {
        // Stored zero tokens, but two hours have passed.
        let (limiter, user_id) = limiter_with_user(0, 2);
        let decision = limiter.before(ctx(user_id), Utc::now()).unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn before_never_consumes() {
        let (limiter, user_id) = limiter_with_user(5, 0);
        for _ in 0..3 {
            limiter.before(ctx(user_id), Utc::now()).unwrap();
        }
        let user = limiter.store.get_user(&user_id).unwrap().unwrap();
        assert_eq!(user.bucket.token_count, 5);
    }

    #[test]
    fn after_success_emits_headers_without_consuming() {
        let (limiter, user_id) = limiter_with_user(5, 0);
        let mutation = limiter
            .after(ctx(user_id), RequestOutcome::Success, Utc::now())
            .unwrap();
        match mutation {
            ResponseMutation::Headers(h) => {
                assert_eq!(h.limit, BUCKET_CAPACITY);
                assert_eq!(h.remaining, 5);
            }
            other => panic!("expected Headers, got {other:?}"),
        }
        let user = limiter.store.get_user(&user_id).unwrap().unwrap();
        assert_eq!(user.bucket.token_count, 5);
    }

    #[test]
    fn after_qualifying_failure_consumes_exactly_one() {
        let (limiter, user_id) = limiter_with_user(5, 0);
        let mutation = limiter
            .after(
                ctx(user_id),
                RequestOutcome::Failure {
                    consumes_token: true,
                },
                Utc::now(),
            )
            .unwrap();
        match mutation {
            ResponseMutation::Headers(h) => assert_eq!(h.remaining, 4),
            other => panic!("expected Headers, got {other:?}"),
        }
        let user = limiter.store.get_user(&user_id).unwrap().unwrap();
        assert_eq!(user.bucket.token_count, 4);
    }

    #[test]
    fn after_non_qualifying_failure_is_a_passthrough() {
        let (limiter, user_id) = limiter_with_user(5, 0);
        let mutation = limiter
            .after(
                ctx(user_id),
                RequestOutcome::Failure {
                    consumes_token: false,
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(mutation, ResponseMutation::None);
        let user = limiter.store.get_user(&user_id).unwrap().unwrap();
        assert_eq!(user.bucket.token_count, 5);
    }

    #[test]
    fn after_last_token_triggers_429_override() {
        let (limiter, user_id) = limiter_with_user(1, 0);
        let mutation = limiter
            .after(
                ctx(user_id),
                RequestOutcome::Failure {
                    consumes_token: true,
                },
                Utc::now(),
            )
            .unwrap();
        match mutation {
            ResponseMutation::RateLimited {
                headers,
                retry_after_secs,
            } => {
                assert_eq!(headers.remaining, 0);
                assert_eq!(retry_after_secs, 3600);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn after_skips_anonymous_requests() {
        let (limiter, _) = limiter_with_user(5, 0);
        let mutation = limiter
            .after(
                RequestContext::default(),
                RequestOutcome::Failure {
                    consumes_token: true,
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(mutation, ResponseMutation::None);
    }

    #[test]
    fn classify_prefers_typed_error_class() {
        let mut response = HttpResponse::new(());
        *response.status_mut() = StatusCode::NOT_FOUND;
        response.extensions_mut().insert(ErrorClass {
            consumes_token: false,
        });
        assert_eq!(
            classify_response(&response),
            RequestOutcome::Failure {
                consumes_token: false
            }
        );
    }

    #[test]
    fn classify_falls_back_on_status() {
        let mut response = HttpResponse::new(());
        *response.status_mut() = StatusCode::UNPROCESSABLE_ENTITY;
        assert_eq!(
            classify_response(&response),
            RequestOutcome::Failure {
                consumes_token: true
            }
        );

        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        assert_eq!(
            classify_response(&response),
            RequestOutcome::Failure {
                consumes_token: false
            }
        );

        *response.status_mut() = StatusCode::CREATED;
        assert_eq!(classify_response(&response), RequestOutcome::Success);
    }
}
