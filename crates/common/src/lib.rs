//! Shared types for the authorization ledger system.

pub mod amount;
pub mod types;

pub use amount::Amount;
pub use types::{AccountId, AuthorizationId, OutboxId};
