//! Notification collaborator invoked after an authorized commit.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::Amount;
use thiserror::Error;

/// Failure of a notification send. Logged by the caller, never propagated
/// into the authorize result.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification send failed: {0}")]
    Send(String),
}

/// Arguments for the notification message template.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationTemplate {
    pub account_name: String,
    pub amount: Amount,
}

/// External notification channel (SMS/e-mail).
///
/// Fire-and-forget from the coordinator's perspective: the send runs in a
/// spawned task after the authorize transaction has committed, and its
/// outcome is only logged.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Sends a notification to the given contact.
    async fn notify(
        &self,
        contact: &str,
        template: NotificationTemplate,
    ) -> Result<(), NotificationError>;
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<(String, NotificationTemplate)>,
    fail_on_notify: bool,
}

/// In-memory notification service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    /// Creates a new in-memory notification service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on subsequent notify calls.
    pub fn set_fail_on_notify(&self, fail: bool) {
        self.state.write().unwrap().fail_on_notify = fail;
    }

    /// Returns the number of notifications sent.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    /// Returns the recorded notifications.
    pub fn sent(&self) -> Vec<(String, NotificationTemplate)> {
        self.state.read().unwrap().sent.clone()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn notify(
        &self,
        contact: &str,
        template: NotificationTemplate,
    ) -> Result<(), NotificationError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_notify {
            return Err(NotificationError::Send("channel unavailable".to_string()));
        }
        state.sent.push((contact.to_string(), template));
        Ok(())
    }
}
