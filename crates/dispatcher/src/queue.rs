//! Queue dispatch protocol and in-memory client.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OutboxId;

use crate::error::{DispatchError, Result};

/// One entry of a batch send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: OutboxId,
    pub body: String,
}

/// Successful delivery of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAck {
    pub entry_id: OutboxId,
    /// Delivery acknowledgment id assigned by the queue.
    pub delivery_id: String,
}

/// Failed delivery of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub entry_id: OutboxId,
    pub reason: String,
}

/// Per-entry outcome of a batch send; a response may mix both.
#[derive(Debug, Clone, Default)]
pub struct BatchResponse {
    pub successful: Vec<DeliveryAck>,
    pub failed: Vec<DeliveryFailure>,
}

/// Downstream queue accepting batches of at most
/// [`MAX_BATCH_SIZE`](crate::MAX_BATCH_SIZE) entries.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Sends one batch. A transport-level error fails the whole batch;
    /// otherwise the response accounts for every entry individually.
    async fn send_batch(&self, entries: Vec<QueueEntry>) -> Result<BatchResponse>;
}

#[derive(Debug, Default)]
struct InMemoryQueueState {
    batches: Vec<Vec<OutboxId>>,
    delivered: Vec<QueueEntry>,
    next_delivery_id: u32,
    fail_entries: HashSet<OutboxId>,
    fail_transport: bool,
}

/// In-memory queue client for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueueClient {
    state: Arc<RwLock<InMemoryQueueState>>,
}

impl InMemoryQueueClient {
    /// Creates a new in-memory queue client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes delivery of the given entry fail with a per-entry error.
    pub fn fail_entry(&self, id: OutboxId) {
        self.state.write().unwrap().fail_entries.insert(id);
    }

    /// Makes every batch send fail at the transport level.
    pub fn set_fail_transport(&self, fail: bool) {
        self.state.write().unwrap().fail_transport = fail;
    }

    /// Sizes of the batches received, in arrival order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state
            .read()
            .unwrap()
            .batches
            .iter()
            .map(|b| b.len())
            .collect()
    }

    /// Entries delivered so far, across all batches.
    pub fn delivered(&self) -> Vec<QueueEntry> {
        self.state.read().unwrap().delivered.clone()
    }

    /// Number of entries delivered so far.
    pub fn delivered_count(&self) -> usize {
        self.state.read().unwrap().delivered.len()
    }
}

#[async_trait]
impl QueueClient for InMemoryQueueClient {
    async fn send_batch(&self, entries: Vec<QueueEntry>) -> Result<BatchResponse> {
        let mut state = self.state.write().unwrap();
        if state.fail_transport {
            return Err(DispatchError::Transport("queue unreachable".to_string()));
        }

        state.batches.push(entries.iter().map(|e| e.id).collect());

        let mut response = BatchResponse::default();
        for entry in entries {
            if state.fail_entries.contains(&entry.id) {
                response.failed.push(DeliveryFailure {
                    entry_id: entry.id,
                    reason: "delivery rejected".to_string(),
                });
            } else {
                state.next_delivery_id += 1;
                response.successful.push(DeliveryAck {
                    entry_id: entry.id,
                    delivery_id: format!("MSG-{:04}", state.next_delivery_id),
                });
                state.delivered.push(entry);
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: OutboxId) -> QueueEntry {
        QueueEntry {
            id,
            body: id.to_string(),
        }
    }

    #[tokio::test]
    async fn mixed_batch_response() {
        let client = InMemoryQueueClient::new();
        let ok_id = OutboxId::new();
        let bad_id = OutboxId::new();
        client.fail_entry(bad_id);

        let response = client
            .send_batch(vec![entry(ok_id), entry(bad_id)])
            .await
            .unwrap();

        assert_eq!(response.successful.len(), 1);
        assert_eq!(response.successful[0].entry_id, ok_id);
        assert!(response.successful[0].delivery_id.starts_with("MSG-"));
        assert_eq!(response.failed.len(), 1);
        assert_eq!(response.failed[0].entry_id, bad_id);
    }

    #[tokio::test]
    async fn transport_failure_fails_whole_batch() {
        let client = InMemoryQueueClient::new();
        client.set_fail_transport(true);

        let result = client.send_batch(vec![entry(OutboxId::new())]).await;
        assert!(matches!(result, Err(DispatchError::Transport(_))));
        assert_eq!(client.delivered_count(), 0);
    }
}
