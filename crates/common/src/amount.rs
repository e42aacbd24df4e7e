//! Exact-decimal monetary amount.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monetary amount backed by an exact decimal.
///
/// Balances, reservations, and authorization amounts are all expressed as
/// `Amount`. Arithmetic is checked; ledger invariants (non-negative balance,
/// `reserved <= balance`) are enforced by the account record, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// Zero amount.
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Creates an amount from a decimal value.
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Creates an amount from major and minor units, e.g. `(12, 50)` for 12.50.
    pub fn from_major_minor(major: i64, minor: u32) -> Self {
        Self(Decimal::new(major * 100 + i64::from(minor), 2))
    }

    /// Returns the underlying decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Checked addition.
    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction.
    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}
