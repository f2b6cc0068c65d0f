//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{account_keys, accounts, health, transactions, users};
use crate::rate_limit::leaky_bucket_middleware;
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Liveness
/// - `POST /user` - Register a user (bucket starts full)
///
/// ## Authenticated (opaque bearer user id)
/// - `GET /user/me` - Caller with live token projection
/// - `POST /account`, `GET /account/me`, `DELETE /account/:id`
/// - `GET /account/:id/transactions` - Paginated ledger listing
/// - `POST /account-key`, `GET /account-key`, `GET /account-key/:key`
/// - `GET /transaction/:id`, `GET /transaction/:id/status`,
///   `GET /transaction/:id/sse`
///
/// ## Admission-gated (leaky bucket)
/// - `POST /transaction` - Validate, record pending, enqueue settlement.
///   Emits `X-RateLimit-*` headers; qualifying failures consume a token and
///   can flip the response to 429.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    // Only transaction admission spends bucket tokens; status observation
    // must stay free or polling a rejected id would drain the caller.
    let gated_routes = Router::new()
        .route("/transaction", post(transactions::create_transaction))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            leaky_bucket_middleware,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/user", post(users::create_user))
        .route("/user/me", get(users::get_me))
        .route("/account", post(accounts::create_account))
        .route("/account/me", get(accounts::get_my_account))
        .route("/account/:id", delete(accounts::delete_account))
        .route(
            "/account/:id/transactions",
            get(accounts::list_account_transactions),
        )
        .route(
            "/account-key",
            post(account_keys::create_key).get(account_keys::list_my_keys),
        )
        .route("/account-key/:key", get(account_keys::resolve_key))
        .route("/transaction/:id", get(transactions::get_transaction))
        .route("/transaction/:id/status", get(transactions::get_status))
        .route("/transaction/:id/sse", get(transactions::stream_status))
        .merge(gated_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins; `*` allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<axum::http::HeaderValue> =
            origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}
