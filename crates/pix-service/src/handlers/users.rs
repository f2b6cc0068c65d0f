//! User handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use pix_core::{User, BUCKET_CAPACITY};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// User response, with the live token projection.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Bucket capacity.
    pub token_limit: i64,
    /// Effective tokens right now.
    pub tokens_remaining: i64,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            token_limit: BUCKET_CAPACITY,
            tokens_remaining: user.bucket.effective_tokens(Utc::now()).max(0),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Create user request.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

/// Register a new user. Public; the bucket starts full.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() {
        return Err(ApiError::BadRequest("name and email are required".into()));
    }

    let user = User::new(body.name, body.email);
    state.store.put_user(&user)?;

    tracing::info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Get the calling user with their live token projection.
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .get_user(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    Ok(Json(UserResponse::from(&user)))
}
