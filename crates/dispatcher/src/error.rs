use ledger_store::LedgerStoreError;
use thiserror::Error;

/// Errors that can occur during outbox dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The scan or marker transaction failed.
    #[error("Ledger store error: {0}")]
    Store(#[from] LedgerStoreError),

    /// The queue rejected a whole batch send. The affected entries stay
    /// pending and are retried by a later cycle.
    #[error("Queue transport error: {0}")]
    Transport(String),
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
