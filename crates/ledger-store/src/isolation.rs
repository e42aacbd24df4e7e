//! Consistency policy: required isolation per operation category.

use serde::{Deserialize, Serialize};

/// Transaction isolation strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Reads see only committed data; mutated rows are locked for the
    /// duration of the read-modify-write.
    ReadCommitted,
    /// Full serializable isolation.
    Serializable,
}

impl IsolationLevel {
    /// SQL statement applied right after `BEGIN` on PostgreSQL.
    pub fn set_transaction_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            IsolationLevel::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IsolationLevel::ReadCommitted => write!(f, "read_committed"),
            IsolationLevel::Serializable => write!(f, "serializable"),
        }
    }
}

/// Category of ledger operation, used to pick the isolation level a
/// transaction scope runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationCategory {
    /// Account open/close. Rare, no hot contention.
    Admin,
    /// Direct credit or debit of a single account.
    BalanceMutation,
    /// The authorize unit of work: balance check, reservation, and
    /// decision write. Most exposed to concurrent-request races; two
    /// concurrent reservations against one account must never jointly
    /// over-reserve past the balance. Exclusivity comes from the lock on
    /// the sender's row, so a blocked scope re-reads the committed state
    /// once the lock is released and serializes behind it.
    Authorization,
    /// The dispatcher's pending-outbox scan. The batch must reflect one
    /// consistent snapshot of pending entries.
    DispatchScan,
}

impl OperationCategory {
    /// Required isolation for this category.
    pub fn isolation(&self) -> IsolationLevel {
        match self {
            OperationCategory::Admin => IsolationLevel::Serializable,
            OperationCategory::BalanceMutation => IsolationLevel::ReadCommitted,
            // Not Serializable: under SSI a scope that blocked on the
            // sender's row lock would be aborted with a serialization
            // failure when the holder commits, instead of re-reading.
            // The row lock alone gives the serial ordering.
            OperationCategory::Authorization => IsolationLevel::ReadCommitted,
            OperationCategory::DispatchScan => IsolationLevel::Serializable,
        }
    }
}

impl std::fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationCategory::Admin => write!(f, "admin"),
            OperationCategory::BalanceMutation => write!(f, "balance_mutation"),
            OperationCategory::Authorization => write!(f, "authorization"),
            OperationCategory::DispatchScan => write!(f, "dispatch_scan"),
        }
    }
}
