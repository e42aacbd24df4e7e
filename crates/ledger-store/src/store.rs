use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, AuthorizationId, OutboxId};

use crate::account::Account;
use crate::error::Result;
use crate::isolation::OperationCategory;
use crate::outbox::{Authorization, Outbox, OutboxStatus};

/// One open transaction scope against the ledger.
///
/// Obtained from [`LedgerStore::begin`] with the operation category whose
/// isolation requirements the scope must honor. Nothing done through a
/// transaction is visible to other readers until [`commit`] returns; if the
/// scope is dropped or [`rollback`] is called, every change is discarded.
///
/// Backends must guarantee that, within a scope's category isolation, the
/// read-modify-write of a single account cannot interleave with another
/// scope's mutation of the same account.
///
/// [`commit`]: LedgerTransaction::commit
/// [`rollback`]: LedgerTransaction::rollback
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Reads an account, locking its row for the remainder of the scope.
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>>;

    /// Inserts a newly opened account.
    async fn insert_account(&mut self, account: &Account) -> Result<()>;

    /// Writes back a mutated account.
    async fn update_account(&mut self, account: &Account) -> Result<()>;

    /// Removes an account. Returns false if the id was unknown.
    async fn delete_account(&mut self, id: AccountId) -> Result<bool>;

    /// Persists an authorization decision together with its outbox entry.
    async fn insert_decision(&mut self, authorization: &Authorization, outbox: &Outbox)
    -> Result<()>;

    /// Ids of undispatched outbox entries with the given status, in
    /// creation order (oldest first).
    async fn pending_outboxes(&mut self, status: OutboxStatus) -> Result<Vec<OutboxId>>;

    /// Marks an outbox entry as delivered at the given instant.
    async fn mark_dispatched(&mut self, id: OutboxId, at: DateTime<Utc>) -> Result<()>;

    /// Commits every change made through this scope atomically.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every change made through this scope.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Storage backend for accounts, authorizations, and outbox entries.
///
/// All implementations must be thread-safe (Send + Sync). The direct
/// getters read committed state outside any transaction and are meant for
/// inspection, API reads, and tests.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Opens a transaction scope at the isolation the category requires.
    async fn begin(&self, category: OperationCategory) -> Result<Box<dyn LedgerTransaction>>;

    /// Reads a committed account.
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    /// Reads a committed authorization.
    async fn get_authorization(&self, id: AuthorizationId) -> Result<Option<Authorization>>;

    /// Reads a committed outbox entry.
    async fn get_outbox(&self, id: OutboxId) -> Result<Option<Outbox>>;
}
