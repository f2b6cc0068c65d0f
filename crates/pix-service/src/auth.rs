//! Request identity extraction.
//!
//! Authentication itself is an upstream collaborator: a gateway verifies the
//! caller and forwards an opaque user id as the bearer token. This module
//! only extracts that id into an explicit value passed down the call chain,
//! never by mutating shared request state:
//!
//! - [`AuthUser`] - requires an identity; rejects with 401 when absent.
//! - [`RequestContext`] - optional identity; used by the admission middleware,
//!   which fails open for unauthenticated routes by design.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use pix_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The verified user id.
    pub user_id: UserId,
}

/// The caller's identity, if any. Never rejects.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    /// The verified user id, when the request carried one.
    pub user_id: Option<UserId>,
}

fn bearer_user_id(parts: &Parts) -> Option<UserId> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| token.parse::<UserId>().ok())
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = bearer_user_id(parts).ok_or(ApiError::Unauthorized)?;
            Ok(AuthUser { user_id })
        })
    }
}

impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = std::convert::Infallible;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            Ok(RequestContext {
                user_id: bearer_user_id(parts),
            })
        })
    }
}
