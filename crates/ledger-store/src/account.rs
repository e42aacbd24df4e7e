//! Account record and its balance invariants.

use common::{AccountId, Amount};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerStoreError, Result};

/// A ledger account.
///
/// Invariants, observed by every reader:
/// - `balance >= 0`
/// - `0 <= reserved <= balance`
/// - `available() = balance - reserved >= 0`
///
/// All mutations go through the checked methods below; the fields are
/// private so no caller can break the invariants directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    name: String,
    account_type: String,
    /// Contact used by the notification collaborator after an authorized
    /// commit (phone number or e-mail address).
    contact: String,
    balance: Amount,
    reserved: Amount,
}

impl Account {
    /// Opens a new account with the given balance and nothing reserved.
    pub fn open(
        name: impl Into<String>,
        account_type: impl Into<String>,
        contact: impl Into<String>,
        initial_balance: Amount,
    ) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            account_type: account_type.into(),
            contact: contact.into(),
            balance: initial_balance,
            reserved: Amount::ZERO,
        }
    }

    /// Reconstructs an account from stored fields. Storage backends only.
    pub fn from_parts(
        id: AccountId,
        name: String,
        account_type: String,
        contact: String,
        balance: Amount,
        reserved: Amount,
    ) -> Self {
        Self {
            id,
            name,
            account_type,
            contact,
            balance,
            reserved,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn account_type(&self) -> &str {
        &self.account_type
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn reserved(&self) -> Amount {
        self.reserved
    }

    /// Balance minus reserved funds; the quantity checked before
    /// authorizing a new transaction.
    pub fn available(&self) -> Amount {
        self.balance
            .checked_sub(self.reserved)
            .unwrap_or(Amount::ZERO)
    }

    /// True if the available balance covers `amount`.
    pub fn can_cover(&self, amount: Amount) -> bool {
        self.available() >= amount
    }

    /// Increases the balance by `amount`.
    pub fn credit(&mut self, amount: Amount) -> Result<()> {
        Self::require_positive(amount)?;
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerStoreError::AmountOverflow(self.id))?;
        Ok(())
    }

    /// Decreases the balance by `amount`.
    ///
    /// Fails with `InsufficientFunds` if the balance would go negative.
    pub fn debit(&mut self, amount: Amount) -> Result<()> {
        Self::require_positive(amount)?;
        let remaining = self
            .balance
            .checked_sub(amount)
            .ok_or(LedgerStoreError::AmountOverflow(self.id))?;
        if remaining.is_negative() {
            return Err(LedgerStoreError::InsufficientFunds {
                account: self.id,
                requested: amount,
                covered: self.balance,
            });
        }
        self.balance = remaining;
        Ok(())
    }

    /// Earmarks `amount` against this account.
    ///
    /// Succeeds only if the available balance covers the amount, so the
    /// sum of reservations can never exceed the balance.
    pub fn reserve(&mut self, amount: Amount) -> Result<()> {
        Self::require_positive(amount)?;
        if !self.can_cover(amount) {
            return Err(LedgerStoreError::InsufficientFunds {
                account: self.id,
                requested: amount,
                covered: self.available(),
            });
        }
        self.reserved = self
            .reserved
            .checked_add(amount)
            .ok_or(LedgerStoreError::AmountOverflow(self.id))?;
        Ok(())
    }

    /// Returns `amount` of reserved funds to the available balance.
    pub fn release(&mut self, amount: Amount) -> Result<()> {
        Self::require_positive(amount)?;
        let remaining = self
            .reserved
            .checked_sub(amount)
            .ok_or(LedgerStoreError::AmountOverflow(self.id))?;
        if remaining.is_negative() {
            return Err(LedgerStoreError::ReleaseExceedsReserved {
                account: self.id,
                requested: amount,
                reserved: self.reserved,
            });
        }
        self.reserved = remaining;
        Ok(())
    }

    fn require_positive(amount: Amount) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerStoreError::NonPositiveAmount(amount));
        }
        Ok(())
    }
}
