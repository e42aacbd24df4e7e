//! Outbox dispatch pipeline.
//!
//! A periodic task scans the ledger store for undispatched `Authorized`
//! outbox entries, partitions them into bounded batches, and sends each
//! batch to the downstream queue with per-entry success/failure accounting.
//! Delivered entries are marked dispatched so no later cycle rediscovers
//! them; failed entries stay pending and are retried by the next cycle.

pub mod dispatcher;
pub mod error;
pub mod idle;
pub mod queue;
pub mod task;

pub use dispatcher::{CycleReport, OutboxDispatcher, MAX_BATCH_SIZE};
pub use error::{DispatchError, Result};
pub use idle::{IdleScaling, InMemoryIdleScaling};
pub use queue::{
    BatchResponse, DeliveryAck, DeliveryFailure, InMemoryQueueClient, QueueClient, QueueEntry,
};
pub use task::DispatcherTask;
