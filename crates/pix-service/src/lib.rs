//! Pix-Bank HTTP API and settlement worker.
//!
//! This crate wires the domain together:
//!
//! - Leaky-bucket admission control around transaction submission
//! - The optimistic admission pipeline (validate, record pending, enqueue)
//! - The settlement consumer applying balance mutations asynchronously
//! - Status observation by polling or server-sent events
//!
//! # Authentication
//!
//! Identity verification happens upstream; requests carry an opaque,
//! already-verified user id as the bearer token. See [`auth`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Axum handlers all return Result and are async for routing consistency.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unused_async)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod rate_limit;
pub mod routes;
pub mod settlement;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use pipeline::{ReceiverRef, TransactionPipeline};
pub use rate_limit::LeakyBucket;
pub use routes::create_router;
pub use settlement::SettlementConsumer;
pub use state::AppState;
