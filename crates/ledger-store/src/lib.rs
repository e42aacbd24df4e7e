pub mod account;
pub mod error;
pub mod isolation;
pub mod memory;
pub mod outbox;
pub mod postgres;
pub mod store;

pub use account::Account;
pub use common::{AccountId, Amount, AuthorizationId, OutboxId};
pub use error::{LedgerStoreError, Result};
pub use isolation::{IsolationLevel, OperationCategory};
pub use memory::InMemoryLedgerStore;
pub use outbox::{Authorization, Outbox, OutboxStatus};
pub use postgres::PostgresLedgerStore;
pub use store::{LedgerStore, LedgerTransaction};
