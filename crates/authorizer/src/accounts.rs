//! Administrative and balance-mutating surface of the account ledger.

use common::{AccountId, Amount};
use ledger_store::{Account, LedgerStore, LedgerStoreError, OperationCategory};

/// Service for managing ledger accounts.
///
/// Each operation runs in its own transaction scope at the isolation its
/// category requires: open/close are serializable, credit/debit/release run
/// at read-committed with the account row locked for the read-modify-write.
pub struct AccountService<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> AccountService<S> {
    /// Creates a new account service on the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Opens a new account. The initial balance may be zero but not
    /// negative; nothing is reserved on a fresh account.
    #[tracing::instrument(skip(self, name, account_type, contact))]
    pub async fn open_account(
        &self,
        name: &str,
        account_type: &str,
        contact: &str,
        initial_balance: Amount,
    ) -> Result<Account, LedgerStoreError> {
        if initial_balance.is_negative() {
            return Err(LedgerStoreError::NonPositiveAmount(initial_balance));
        }

        let account = Account::open(name, account_type, contact, initial_balance);
        let mut tx = self.store.begin(OperationCategory::Admin).await?;
        tx.insert_account(&account).await?;
        tx.commit().await?;

        metrics::counter!("accounts_opened_total").increment(1);
        tracing::info!(account_id = %account.id(), "account opened");
        Ok(account)
    }

    /// Closes an account.
    ///
    /// Fails with `AccountNotFound` if the id is unknown. No zero-balance
    /// precondition is enforced; see DESIGN notes.
    #[tracing::instrument(skip(self))]
    pub async fn close_account(&self, id: AccountId) -> Result<(), LedgerStoreError> {
        let mut tx = self.store.begin(OperationCategory::Admin).await?;
        if !tx.delete_account(id).await? {
            tx.rollback().await?;
            return Err(LedgerStoreError::AccountNotFound(id));
        }
        tx.commit().await?;

        tracing::info!(account_id = %id, "account closed");
        Ok(())
    }

    /// Credits an account with a strictly positive amount.
    #[tracing::instrument(skip(self))]
    pub async fn credit(&self, id: AccountId, amount: Amount) -> Result<Account, LedgerStoreError> {
        self.mutate(id, |account| account.credit(amount)).await
    }

    /// Debits an account with a strictly positive amount.
    ///
    /// Fails with `InsufficientFunds` if the balance would go negative; the
    /// account is left untouched.
    #[tracing::instrument(skip(self))]
    pub async fn debit(&self, id: AccountId, amount: Amount) -> Result<Account, LedgerStoreError> {
        self.mutate(id, |account| account.debit(amount)).await
    }

    /// Returns reserved funds to the available balance, e.g. when a
    /// downstream settlement step voids an authorized transaction.
    #[tracing::instrument(skip(self))]
    pub async fn release(&self, id: AccountId, amount: Amount) -> Result<Account, LedgerStoreError> {
        self.mutate(id, |account| account.release(amount)).await
    }

    /// Reads an account's committed state.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>, LedgerStoreError> {
        self.store.get_account(id).await
    }

    /// Runs one read-modify-write on an account inside a balance-mutation
    /// transaction scope. Domain rejections roll the scope back and leave
    /// no state change.
    async fn mutate<F>(&self, id: AccountId, f: F) -> Result<Account, LedgerStoreError>
    where
        F: FnOnce(&mut Account) -> Result<(), LedgerStoreError>,
    {
        let mut tx = self.store.begin(OperationCategory::BalanceMutation).await?;
        let Some(mut account) = tx.account(id).await? else {
            tx.rollback().await?;
            return Err(LedgerStoreError::AccountNotFound(id));
        };

        if let Err(rejection) = f(&mut account) {
            tx.rollback().await?;
            return Err(rejection);
        }

        tx.update_account(&account).await?;
        tx.commit().await?;
        Ok(account)
    }
}
