//! Authorization error types.

use std::time::Duration;

use common::AccountId;
use ledger_store::LedgerStoreError;
use thiserror::Error;

/// Errors that can occur while handling an authorization request.
///
/// A decline is not an error: it is a committed business outcome returned
/// as a [`Decision`](crate::Decision).
#[derive(Debug, Error)]
pub enum AuthorizeError {
    /// Malformed or missing input, rejected before any persistence.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A named party of the request does not exist. Nothing is persisted.
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    /// The whole unit of work exceeded its wall-clock budget and was
    /// aborted with no partial state.
    #[error("Authorization timed out after {0:?}")]
    Timeout(Duration),

    /// Storage failure; the unit of work was rolled back entirely.
    #[error("Ledger store error: {0}")]
    Store(LedgerStoreError),
}

impl AuthorizeError {
    /// True for transient failures a caller may retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthorizeError::Timeout(_) => true,
            AuthorizeError::Store(e) => e.is_infrastructure(),
            _ => false,
        }
    }
}

impl From<LedgerStoreError> for AuthorizeError {
    fn from(e: LedgerStoreError) -> Self {
        match e {
            // Keep the missing party named at this level.
            LedgerStoreError::AccountNotFound(id) => AuthorizeError::AccountNotFound(id),
            other => AuthorizeError::Store(other),
        }
    }
}

/// Convenience type alias for authorization results.
pub type Result<T> = std::result::Result<T, AuthorizeError>;
