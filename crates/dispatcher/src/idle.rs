//! Idle-scaling collaborator signaled when a cycle finds nothing pending.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

/// External interface for scaling down the compute unit running the
/// poller when there is no work. Not core logic: implementations may stop
/// a container task, or do nothing at all.
#[async_trait]
pub trait IdleScaling: Send + Sync {
    /// Requests deprovisioning. Failures are the implementation's problem
    /// to log; the dispatch cycle never depends on the outcome.
    async fn request_scale_down(&self);
}

/// Counting implementation for tests and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdleScaling {
    requests: Arc<AtomicUsize>,
}

impl InMemoryIdleScaling {
    /// Creates a new idle-scaling recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scale-down requests observed.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdleScaling for InMemoryIdleScaling {
    async fn request_scale_down(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        tracing::info!("requested scale-down of idle dispatcher");
    }
}
