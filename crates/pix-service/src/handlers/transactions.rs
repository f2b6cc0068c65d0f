//! Transaction handlers: admission, detail, and status observation.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};

use pix_core::{AccountId, Transaction, TransactionId, TransactionStatus};
use pix_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::pipeline::ReceiverRef;
use crate::state::AppState;

/// Full transaction response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction id.
    pub id: String,
    /// Amount in cents.
    pub amount: i64,
    /// Debited account.
    pub sender_account_id: String,
    /// Credited account.
    pub receiver_account_id: String,
    /// Current status.
    pub status: TransactionStatus,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&Transaction> for TransactionResponse {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            amount: tx.amount,
            sender_account_id: tx.sender_account_id.to_string(),
            receiver_account_id: tx.receiver_account_id.to_string(),
            status: tx.status,
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// Create transaction request. The receiver is named by PIX key (preferred)
/// or by direct account id; the sender defaults to the caller's account.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Sending account; defaults to the caller's account. Must be owned by
    /// the caller either way.
    pub sender_id: Option<AccountId>,
    /// Receiver PIX key.
    pub receiver_key: Option<String>,
    /// Receiver account id (used when no key is given).
    pub receiver_id: Option<AccountId>,
    /// Amount in cents.
    pub amount: i64,
}

/// Admission response: the pending transaction handle.
#[derive(Debug, Serialize)]
pub struct CreateTransactionResponse {
    /// The created transaction id.
    pub transaction_id: String,
    /// Always `pending` at admission time.
    pub status: TransactionStatus,
}

/// Status-only response used by polling and the SSE stream.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Current status.
    pub status: TransactionStatus,
}

/// Submit a transfer: validate, record `Pending`, enqueue settlement.
///
/// Runs behind the leaky-bucket middleware; every client-caused rejection
/// here costs the caller one token.
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<CreateTransactionResponse>), ApiError> {
    let receiver = match (body.receiver_key, body.receiver_id) {
        (Some(key), _) => ReceiverRef::Key(key),
        (None, Some(id)) => ReceiverRef::Id(id),
        (None, None) => {
            return Err(ApiError::BadRequest(
                "either receiver_key or receiver_id is required".into(),
            ))
        }
    };

    let sender_id = match body.sender_id {
        Some(id) => id,
        None => {
            state
                .store
                .get_account_by_user(&auth.user_id)?
                .ok_or_else(|| ApiError::NotFound("no account for this user".into()))?
                .id
        }
    };

    let transaction = state
        .pipeline()
        .submit(&auth.user_id, &sender_id, &receiver, body.amount)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTransactionResponse {
            transaction_id: transaction.id.to_string(),
            status: transaction.status,
        }),
    ))
}

/// Get a transaction by id.
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<TransactionId>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let tx = state.pipeline().status_of(&id)?;
    Ok(Json(TransactionResponse::from(&tx)))
}

/// Get the current status of a transaction.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<TransactionId>,
) -> Result<Json<StatusResponse>, ApiError> {
    let tx = state.pipeline().status_of(&id)?;
    Ok(Json(StatusResponse { status: tx.status }))
}

enum StreamPhase {
    Ready(TransactionStatus),
    Poll,
    Finished,
}

/// Stream status updates over SSE until the transaction leaves `Pending`.
///
/// The store is polled at a fixed sub-second interval; the stream ends after
/// the first terminal status, and a client disconnect drops it, stopping the
/// poll loop.
pub async fn stream_status(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<TransactionId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let first = state.pipeline().status_of(&id)?.status;
    let store = Arc::clone(&state.store);
    let interval = Duration::from_millis(state.config.status_poll_interval_ms);

    let stream = futures::stream::unfold(StreamPhase::Ready(first), move |phase| {
        let store: Arc<dyn Store> = Arc::clone(&store);
        async move {
            let status = match phase {
                StreamPhase::Finished => return None,
                StreamPhase::Ready(status) => status,
                StreamPhase::Poll => {
                    tokio::time::sleep(interval).await;
                    match store.get_transaction(&id) {
                        Ok(Some(tx)) => tx.status,
                        // Deleted from under us or backend failure; end the stream.
                        Ok(None) | Err(_) => return None,
                    }
                }
            };

            let next = if status.is_terminal() {
                StreamPhase::Finished
            } else {
                StreamPhase::Poll
            };
            let event = Event::default()
                .event("status")
                .json_data(StatusResponse { status })
                .ok()?;
            Some((Ok::<_, Infallible>(event), next))
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
