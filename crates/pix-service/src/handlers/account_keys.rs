//! PIX key handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use pix_core::{Account, AccountKey};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// PIX key response.
#[derive(Debug, Serialize)]
pub struct AccountKeyResponse {
    /// Key record id.
    pub id: String,
    /// The alias string.
    pub key: String,
    /// The account the key resolves to.
    pub account_id: String,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&AccountKey> for AccountKeyResponse {
    fn from(key: &AccountKey) -> Self {
        Self {
            id: key.id.to_string(),
            key: key.key.clone(),
            account_id: key.account_id.to_string(),
            created_at: key.created_at.to_rfc3339(),
        }
    }
}

/// Resolution response: the key plus recipient display data.
#[derive(Debug, Serialize)]
pub struct ResolvedKeyResponse {
    /// The alias string.
    pub key: String,
    /// The account the key resolves to.
    pub account_id: String,
    /// The recipient's 6-digit account number.
    pub account_number: String,
    /// The recipient's display name.
    pub recipient_name: String,
}

/// Create key request.
#[derive(Debug, Deserialize)]
pub struct CreateAccountKeyRequest {
    /// The alias to register.
    pub key: String,
}

/// Register a PIX key for the caller's account.
pub async fn create_key(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateAccountKeyRequest>,
) -> Result<(StatusCode, Json<AccountKeyResponse>), ApiError> {
    let key_value = body.key.trim().to_string();
    if key_value.is_empty() {
        return Err(ApiError::BadRequest("key must not be empty".into()));
    }

    let account = state
        .store
        .get_account_by_user(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("no account for this user".into()))?;

    let key = AccountKey::new(key_value, account.id);
    state.store.put_account_key(&key)?;

    tracing::info!(key = %key.key, account_id = %account.id, "pix key registered");
    Ok((StatusCode::CREATED, Json(AccountKeyResponse::from(&key))))
}

/// List the caller's PIX keys.
pub async fn list_my_keys(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<AccountKeyResponse>>, ApiError> {
    let keys = state.store.list_account_keys_by_user(&auth.user_id)?;
    Ok(Json(keys.iter().map(AccountKeyResponse::from).collect()))
}

/// Resolve a PIX key to its recipient.
pub async fn resolve_key(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(key): Path<String>,
) -> Result<Json<ResolvedKeyResponse>, ApiError> {
    let record = state
        .store
        .get_account_key(&key)?
        .ok_or_else(|| ApiError::NotFound("recipient for this pix key not found".into()))?;

    let account = state
        .store
        .get_account(&record.account_id)?
        .filter(Account::is_active)
        .ok_or_else(|| ApiError::NotFound("recipient for this pix key not found".into()))?;

    let recipient_name = state
        .store
        .get_user(&account.user_id)?
        .map_or_else(String::new, |u| u.name);

    Ok(Json(ResolvedKeyResponse {
        key: record.key,
        account_id: account.id.to_string(),
        account_number: account.account_number,
        recipient_name,
    }))
}
