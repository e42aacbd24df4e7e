//! API error types with HTTP response mapping.

use authorizer::AuthorizeError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ledger_store::LedgerStoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Ledger store error.
    Store(LedgerStoreError),
    /// Authorization error.
    Authorize(AuthorizeError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Authorize(err) => authorize_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn store_error_to_response(err: LedgerStoreError) -> (StatusCode, String) {
    match &err {
        LedgerStoreError::AccountNotFound(_) | LedgerStoreError::OutboxNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        LedgerStoreError::NonPositiveAmount(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        LedgerStoreError::InsufficientFunds { .. }
        | LedgerStoreError::ReleaseExceedsReserved { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        _ => {
            tracing::error!(error = %err, "ledger store failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn authorize_error_to_response(err: AuthorizeError) -> (StatusCode, String) {
    match err {
        AuthorizeError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        AuthorizeError::AccountNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        AuthorizeError::Timeout(_) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        AuthorizeError::Store(inner) => store_error_to_response(inner),
    }
}

impl From<LedgerStoreError> for ApiError {
    fn from(err: LedgerStoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<AuthorizeError> for ApiError {
    fn from(err: AuthorizeError) -> Self {
        ApiError::Authorize(err)
    }
}
