//! Periodic dispatcher task with an owned start/stop lifecycle.

use std::time::Duration;

use ledger_store::LedgerStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::dispatcher::OutboxDispatcher;
use crate::idle::IdleScaling;
use crate::queue::QueueClient;

/// Handle to the running periodic dispatch task.
///
/// Cycles run inline in the timer loop, so a new cycle can never start
/// while a previous one is still in flight; if a cycle overruns the
/// interval, the next tick is delayed rather than stacked. A failed cycle
/// is logged and the next tick is its retry.
pub struct DispatcherTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl DispatcherTask {
    /// Starts dispatching every `interval`, first cycle after one full
    /// interval has elapsed.
    pub fn start<S, Q, I>(dispatcher: OutboxDispatcher<S, Q, I>, interval: Duration) -> Self
    where
        S: LedgerStore + Clone + 'static,
        Q: QueueClient + 'static,
        I: IdleScaling + 'static,
    {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval yields immediately on its first tick; consume it so
            // cycles fire on the schedule, not at startup
            ticker.tick().await;

            tracing::info!(?interval, "dispatcher task started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = dispatcher.run_cycle().await {
                            tracing::error!(error = %e, "dispatch cycle failed; next tick is the retry");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("dispatcher task stopping");
                        break;
                    }
                }
            }
        });

        Self { shutdown, handle }
    }

    /// Stops the task and waits for the current cycle, if any, to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }

    /// True while the task is still running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}
