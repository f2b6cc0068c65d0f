//! HTTP request handlers.

pub mod account_keys;
pub mod accounts;
pub mod health;
pub mod transactions;
pub mod users;
