//! Account administration and balance-mutation endpoints.

use std::sync::Arc;

use authorizer::{AccountService, AuthorizationCoordinator, InMemoryNotificationService};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{AccountId, Amount};
use ledger_store::{Account, LedgerStore};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: LedgerStore> {
    pub accounts: AccountService<S>,
    pub coordinator: AuthorizationCoordinator<S, InMemoryNotificationService>,
    pub store: S,
}

// -- Request types --

#[derive(Deserialize)]
pub struct OpenAccountRequest {
    pub name: String,
    pub account_type: String,
    pub contact: String,
    pub initial_balance: Amount,
}

#[derive(Deserialize)]
pub struct AmountRequest {
    pub amount: Amount,
}

// -- Response types --

#[derive(Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    pub account_type: String,
    pub contact: String,
    pub balance: Amount,
    pub reserved: Amount,
    pub available: Amount,
}

impl AccountResponse {
    fn from_account(account: &Account) -> Self {
        Self {
            id: account.id().to_string(),
            name: account.name().to_string(),
            account_type: account.account_type().to_string(),
            contact: account.contact().to_string(),
            balance: account.balance(),
            reserved: account.reserved(),
            available: account.available(),
        }
    }
}

// -- Handlers --

/// POST /api/v1/account — open a new account.
#[tracing::instrument(skip(state, req))]
pub async fn open<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<OpenAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let account = state
        .accounts
        .open_account(&req.name, &req.account_type, &req.contact, req.initial_balance)
        .await?;

    Ok((StatusCode::CREATED, Json(AccountResponse::from_account(&account))))
}

/// GET /api/v1/account/{id} — read an account's committed state.
#[tracing::instrument(skip(state))]
pub async fn get<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account_id = parse_account_id(&id)?;
    let account = state
        .accounts
        .get_account(account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Account {id} not found")))?;

    Ok(Json(AccountResponse::from_account(&account)))
}

/// DELETE /api/v1/account/{id} — close an account.
#[tracing::instrument(skip(state))]
pub async fn close<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let account_id = parse_account_id(&id)?;
    state.accounts.close_account(account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/account/{id}/credit — add funds to the balance.
#[tracing::instrument(skip(state, req))]
pub async fn credit<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account_id = parse_account_id(&id)?;
    let account = state.accounts.credit(account_id, req.amount).await?;
    Ok(Json(AccountResponse::from_account(&account)))
}

/// POST /api/v1/account/{id}/debit — remove funds from the balance.
#[tracing::instrument(skip(state, req))]
pub async fn debit<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account_id = parse_account_id(&id)?;
    let account = state.accounts.debit(account_id, req.amount).await?;
    Ok(Json(AccountResponse::from_account(&account)))
}

/// POST /api/v1/account/{id}/release — return reserved funds to the
/// available balance.
#[tracing::instrument(skip(state, req))]
pub async fn release<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AmountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account_id = parse_account_id(&id)?;
    let account = state.accounts.release(account_id, req.amount).await?;
    Ok(Json(AccountResponse::from_account(&account)))
}

pub(crate) fn parse_account_id(id: &str) -> Result<AccountId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(AccountId::from_uuid(uuid))
}
