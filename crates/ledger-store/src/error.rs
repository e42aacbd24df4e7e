use common::{AccountId, Amount, OutboxId};
use thiserror::Error;

/// Errors that can occur when interacting with the ledger store.
#[derive(Debug, Error)]
pub enum LedgerStoreError {
    /// A referenced account does not exist.
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    /// A debit or reservation exceeds what the account can cover.
    ///
    /// For a direct debit this is checked against the balance; for a
    /// reservation it is checked against the available balance.
    #[error("Insufficient funds on account {account}: requested {requested}, covered {covered}")]
    InsufficientFunds {
        account: AccountId,
        requested: Amount,
        covered: Amount,
    },

    /// An operation was called with a non-positive amount.
    #[error("Amount must be strictly positive, got {0}")]
    NonPositiveAmount(Amount),

    /// A release exceeds the currently reserved amount.
    #[error("Release of {requested} exceeds reserved {reserved} on account {account}")]
    ReleaseExceedsReserved {
        account: AccountId,
        requested: Amount,
        reserved: Amount,
    },

    /// The referenced outbox entry does not exist.
    #[error("Outbox entry {0} not found")]
    OutboxNotFound(OutboxId),

    /// Decimal arithmetic overflowed.
    #[error("Amount arithmetic overflowed on account {0}")]
    AmountOverflow(AccountId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl LedgerStoreError {
    /// True for failures of the storage layer itself, as opposed to domain
    /// outcomes such as a missing account or insufficient funds.
    ///
    /// Infrastructure failures abort the enclosing unit of work and are
    /// surfaced to callers as retryable.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            LedgerStoreError::Database(_)
                | LedgerStoreError::Migration(_)
                | LedgerStoreError::AmountOverflow(_)
        )
    }
}

/// Result type for ledger store operations.
pub type Result<T> = std::result::Result<T, LedgerStoreError>;
