//! Account handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use pix_core::{Account, AccountId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::transactions::TransactionResponse;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account id.
    pub id: String,
    /// 6-digit account number.
    pub account_number: String,
    /// Balance in cents.
    pub balance: i64,
    /// Owning user id.
    pub user_id: String,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            account_number: account.account_number.clone(),
            balance: account.balance,
            user_id: account.user_id.to_string(),
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Create account request.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Opening balance in cents.
    #[serde(default)]
    pub balance: i64,
}

/// Open an account for the calling user. One active account per user.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    if body.balance < 0 {
        return Err(ApiError::BadRequest("balance must not be negative".into()));
    }

    if state.store.get_user(&auth.user_id)?.is_none() {
        return Err(ApiError::NotFound("user not found".into()));
    }

    if state.store.get_account_by_user(&auth.user_id)?.is_some() {
        return Err(ApiError::Conflict(
            "user already has an account; each user may have only one".into(),
        ));
    }

    let account = Account::new(auth.user_id, body.balance);
    state.store.put_account(&account)?;

    tracing::info!(
        account_id = %account.id,
        user_id = %auth.user_id,
        "account created"
    );
    Ok((StatusCode::CREATED, Json(AccountResponse::from(&account))))
}

/// Get the calling user's account.
pub async fn get_my_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .store
        .get_account_by_user(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("no account for this user".into()))?;
    Ok(Json(AccountResponse::from(&account)))
}

/// Soft-delete an account. Owner only.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<AccountId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = state
        .store
        .get_account(&id)?
        .filter(Account::is_active)
        .ok_or_else(|| ApiError::NotFound("account not found or inactive".into()))?;

    if account.user_id != auth.user_id {
        return Err(ApiError::Forbidden);
    }

    state.store.soft_delete_account(&id, Utc::now())?;
    tracing::info!(account_id = %id, "account soft-deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Pagination parameters for the transaction listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Page size (default 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Items to skip.
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    100
}

/// List transactions touching an account, newest first. Owner only.
pub async fn list_account_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<AccountId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let account = state
        .store
        .get_account(&id)?
        .filter(Account::is_active)
        .ok_or_else(|| ApiError::NotFound("account not found or inactive".into()))?;

    if account.user_id != auth.user_id {
        return Err(ApiError::Forbidden);
    }

    let transactions = state
        .store
        .list_transactions_by_account(&id, query.limit, query.offset)?;
    Ok(Json(
        transactions.iter().map(TransactionResponse::from).collect(),
    ))
}
