//! Outbox dispatch cycle.

use std::sync::Arc;

use chrono::Utc;
use ledger_store::{LedgerStore, OperationCategory, OutboxStatus};

use crate::error::{DispatchError, Result};
use crate::idle::IdleScaling;
use crate::queue::{QueueClient, QueueEntry};

/// Hard ceiling on batch size, imposed by the downstream queue's
/// batch-send contract.
pub const MAX_BATCH_SIZE: usize = 10;

/// Outcome summary of one dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    /// Pending entries found by the scan.
    pub discovered: usize,
    /// Batches sent.
    pub batches: usize,
    /// Entries acknowledged and marked dispatched.
    pub delivered: usize,
    /// Entries that failed and remain pending for the next cycle.
    pub failed: usize,
}

/// Scans the outbox and dispatches pending entries to the queue.
///
/// One cycle:
/// 1. fetch the pending `Authorized` entry ids in one serializable
///    transaction (a consistent FIFO snapshot); any error here aborts the
///    whole cycle and the next scheduled run is the retry
/// 2. partition the ids into batches of at most [`MAX_BATCH_SIZE`]
/// 3. after the scan has committed, dispatch the batches as independent
///    spawned tasks; one batch's failure never blocks another
/// 4. per entry, record the delivery id and mark it dispatched, or log the
///    error and leave it pending
/// 5. if nothing was pending, signal the idle-scaling collaborator
pub struct OutboxDispatcher<S, Q, I> {
    store: S,
    queue: Arc<Q>,
    idle: Arc<I>,
}

impl<S, Q, I> OutboxDispatcher<S, Q, I>
where
    S: LedgerStore + Clone + 'static,
    Q: QueueClient + 'static,
    I: IdleScaling + 'static,
{
    /// Creates a new dispatcher.
    pub fn new(store: S, queue: Q, idle: I) -> Self {
        Self {
            store,
            queue: Arc::new(queue),
            idle: Arc::new(idle),
        }
    }

    /// Runs one dispatch cycle to completion and reports what happened.
    #[tracing::instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        metrics::counter!("outbox_dispatch_cycles_total").increment(1);
        tracing::info!("starting dispatch cycle");

        let pending = self.scan_pending().await?;
        tracing::info!(found = pending.len(), "pending outbox entries");

        if pending.is_empty() {
            self.idle.request_scale_down().await;
            return Ok(CycleReport::default());
        }

        let mut report = CycleReport {
            discovered: pending.len(),
            ..CycleReport::default()
        };

        // The scan transaction is already committed; batches run
        // independently of it and of each other.
        let mut handles = Vec::new();
        for chunk in pending.chunks(MAX_BATCH_SIZE) {
            let entries: Vec<QueueEntry> = chunk
                .iter()
                .map(|id| QueueEntry {
                    id: *id,
                    body: id.to_string(),
                })
                .collect();
            let store = self.store.clone();
            let queue = Arc::clone(&self.queue);
            handles.push(tokio::spawn(dispatch_batch(store, queue, entries)));
            report.batches += 1;
        }

        for handle in handles {
            match handle.await {
                Ok((delivered, failed)) => {
                    report.delivered += delivered;
                    report.failed += failed;
                }
                Err(e) => {
                    tracing::error!(error = %e, "dispatch batch task panicked");
                }
            }
        }

        metrics::counter!("outbox_entries_dispatched_total").increment(report.delivered as u64);
        metrics::counter!("outbox_entries_failed_total").increment(report.failed as u64);
        tracing::info!(
            discovered = report.discovered,
            batches = report.batches,
            delivered = report.delivered,
            failed = report.failed,
            "dispatch cycle complete"
        );
        Ok(report)
    }

    /// Serializable scan for pending entries. Read-only; committed before
    /// any dispatch begins.
    async fn scan_pending(&self) -> Result<Vec<common::OutboxId>> {
        let mut tx = self.store.begin(OperationCategory::DispatchScan).await?;
        let pending = tx.pending_outboxes(OutboxStatus::Authorized).await?;
        tx.commit().await?;
        Ok(pending)
    }
}

/// Sends one batch and accounts for each entry. Returns
/// `(delivered, failed)` counts.
async fn dispatch_batch<S: LedgerStore, Q: QueueClient>(
    store: S,
    queue: Arc<Q>,
    entries: Vec<QueueEntry>,
) -> (usize, usize) {
    let batch_size = entries.len();
    for entry in &entries {
        tracing::debug!(entry_id = %entry.id, "dispatching entry");
    }

    let response = match queue.send_batch(entries).await {
        Ok(response) => response,
        Err(DispatchError::Transport(reason)) => {
            tracing::warn!(%reason, batch_size, "batch send failed; entries stay pending");
            return (0, batch_size);
        }
        Err(e) => {
            tracing::warn!(error = %e, batch_size, "batch send failed; entries stay pending");
            return (0, batch_size);
        }
    };

    for failure in &response.failed {
        tracing::warn!(
            entry_id = %failure.entry_id,
            reason = %failure.reason,
            "entry delivery failed; will be retried next cycle"
        );
    }

    let mut delivered = 0;
    if !response.successful.is_empty() {
        match mark_batch_dispatched(&store, &response.successful).await {
            Ok(()) => {
                for ack in &response.successful {
                    tracing::info!(
                        entry_id = %ack.entry_id,
                        delivery_id = %ack.delivery_id,
                        "entry dispatched"
                    );
                }
                delivered = response.successful.len();
            }
            Err(e) => {
                // The queue has the entries but the marker write failed;
                // they stay pending and will be redelivered (at-least-once).
                tracing::error!(error = %e, "failed to mark batch dispatched");
            }
        }
    }

    (delivered, batch_size - delivered)
}

async fn mark_batch_dispatched<S: LedgerStore>(
    store: &S,
    acks: &[crate::queue::DeliveryAck],
) -> Result<()> {
    let mut tx = store.begin(OperationCategory::DispatchScan).await?;
    let now = Utc::now();
    for ack in acks {
        tx.mark_dispatched(ack.entry_id, now).await?;
    }
    tx.commit().await?;
    Ok(())
}
