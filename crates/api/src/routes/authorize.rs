//! Funds-authorization endpoint.

use std::sync::Arc;

use authorizer::AuthorizationRequest;
use axum::Json;
use axum::extract::State;
use common::Amount;
use ledger_store::LedgerStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::accounts::{AppState, parse_account_id};

#[derive(Deserialize)]
pub struct AuthorizeRequest {
    pub sender: String,
    pub receiver: String,
    pub amount: Amount,
}

#[derive(Serialize)]
pub struct AuthorizeResponse {
    pub authorization_id: String,
    pub outbox_id: String,
    pub status: String,
}

/// POST /api/v1/authorize — decide a funds transfer.
///
/// A decline is a committed business outcome, so both `AUTHORIZED` and
/// `DECLINED` come back as 200 with the status in the body.
#[tracing::instrument(skip(state, req))]
pub async fn authorize<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AuthorizeRequest>,
) -> Result<Json<AuthorizeResponse>, ApiError> {
    let request = AuthorizationRequest {
        sender: parse_account_id(&req.sender)?,
        receiver: parse_account_id(&req.receiver)?,
        amount: req.amount,
    };

    let decision = state.coordinator.authorize(request).await?;

    Ok(Json(AuthorizeResponse {
        authorization_id: decision.authorization_id.to_string(),
        outbox_id: decision.outbox_id.to_string(),
        status: decision.status.to_string(),
    }))
}
