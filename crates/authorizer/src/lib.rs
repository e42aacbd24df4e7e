//! Authorization layer for the funds-reservation ledger.
//!
//! This crate provides:
//! - `AccountService`, the administrative and balance-mutating surface of
//!   the account ledger (open, close, credit, debit, release)
//! - `AuthorizationCoordinator`, which runs one authorization request as a
//!   single atomic unit of work: account lookup, balance check, funds
//!   reservation, and the decision/outbox write
//! - `NotificationService`, the external collaborator invoked after an
//!   authorized commit

pub mod accounts;
pub mod coordinator;
pub mod error;
pub mod notification;

pub use accounts::AccountService;
pub use coordinator::{
    AuthorizationCoordinator, AuthorizationRequest, Decision, DEFAULT_AUTHORIZE_TIMEOUT,
};
pub use error::{AuthorizeError, Result};
pub use notification::{
    InMemoryNotificationService, NotificationError, NotificationService, NotificationTemplate,
};
