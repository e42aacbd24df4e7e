use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, AuthorizationId, OutboxId};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::account::Account;
use crate::error::{LedgerStoreError, Result};
use crate::isolation::OperationCategory;
use crate::outbox::{Authorization, Outbox, OutboxStatus};
use crate::store::{LedgerStore, LedgerTransaction};

/// In-memory ledger store.
///
/// Holds the whole ledger behind one `RwLock`; a transaction scope takes
/// the write lock for its lifetime and works on a copy of the state, so
/// every transaction is serializable and single-account mutual exclusion
/// holds trivially. Commit swaps the copy in; rollback drops it.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
}

#[derive(Clone, Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    authorizations: HashMap<AuthorizationId, Authorization>,
    // Vec keeps creation order, which gives the FIFO pending scan.
    outboxes: Vec<Outbox>,
}

impl InMemoryLedgerStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of accounts.
    pub async fn account_count(&self) -> usize {
        self.state.read().await.accounts.len()
    }

    /// Returns the number of outbox entries, dispatched or not.
    pub async fn outbox_count(&self) -> usize {
        self.state.read().await.outboxes.len()
    }

    /// Clears all state.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.accounts.clear();
        state.authorizations.clear();
        state.outboxes.clear();
    }
}

struct InMemoryTransaction {
    guard: OwnedRwLockWriteGuard<LedgerState>,
    working: LedgerState,
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.working.accounts.get(&id).cloned())
    }

    async fn insert_account(&mut self, account: &Account) -> Result<()> {
        self.working.accounts.insert(account.id(), account.clone());
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<()> {
        if !self.working.accounts.contains_key(&account.id()) {
            return Err(LedgerStoreError::AccountNotFound(account.id()));
        }
        self.working.accounts.insert(account.id(), account.clone());
        Ok(())
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<bool> {
        Ok(self.working.accounts.remove(&id).is_some())
    }

    async fn insert_decision(
        &mut self,
        authorization: &Authorization,
        outbox: &Outbox,
    ) -> Result<()> {
        self.working
            .authorizations
            .insert(authorization.id, authorization.clone());
        self.working.outboxes.push(outbox.clone());
        Ok(())
    }

    async fn pending_outboxes(&mut self, status: OutboxStatus) -> Result<Vec<OutboxId>> {
        Ok(self
            .working
            .outboxes
            .iter()
            .filter(|o| o.status == status && o.is_pending())
            .map(|o| o.id)
            .collect())
    }

    async fn mark_dispatched(&mut self, id: OutboxId, at: DateTime<Utc>) -> Result<()> {
        let entry = self
            .working
            .outboxes
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(LedgerStoreError::OutboxNotFound(id))?;
        entry.dispatched_at = Some(at);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut guard = self.guard;
        *guard = self.working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Dropping the guard discards the working copy.
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self, category: OperationCategory) -> Result<Box<dyn LedgerTransaction>> {
        tracing::trace!(%category, isolation = %category.isolation(), "opening transaction");
        let guard = self.state.clone().write_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.state.read().await.accounts.get(&id).cloned())
    }

    async fn get_authorization(&self, id: AuthorizationId) -> Result<Option<Authorization>> {
        Ok(self.state.read().await.authorizations.get(&id).cloned())
    }

    async fn get_outbox(&self, id: OutboxId) -> Result<Option<Outbox>> {
        Ok(self
            .state
            .read()
            .await
            .outboxes
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }
}
