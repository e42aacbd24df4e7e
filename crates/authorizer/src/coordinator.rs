//! Authorization coordinator: one atomic unit of work per request.

use std::sync::Arc;
use std::time::Duration;

use common::{AccountId, Amount, AuthorizationId, OutboxId};
use ledger_store::{Authorization, LedgerStore, OperationCategory, OutboxStatus};

use crate::error::{AuthorizeError, Result};
use crate::notification::{NotificationService, NotificationTemplate};

/// Default wall-clock budget for one authorize call.
pub const DEFAULT_AUTHORIZE_TIMEOUT: Duration = Duration::from_secs(180);

/// One inbound authorization request.
///
/// The timestamp of the resulting authorization is assigned server-side
/// when the decision is built, never taken from the caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationRequest {
    pub sender: AccountId,
    pub receiver: AccountId,
    pub amount: Amount,
}

/// The committed outcome of an authorization request.
///
/// Built fresh for every call; decisions are never written into a shared
/// buffer reused across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub authorization_id: AuthorizationId,
    pub outbox_id: OutboxId,
    pub status: OutboxStatus,
}

impl Decision {
    /// True if funds were reserved for this request.
    pub fn is_authorized(&self) -> bool {
        self.status == OutboxStatus::Authorized
    }
}

/// Orchestrates authorization requests against the ledger.
///
/// Per request, inside one atomic transaction scope that holds the
/// sender's row lock for its duration:
/// 1. look up sender and receiver; a missing party aborts with
///    `AccountNotFound` and no state change
/// 2. check the sender's available balance
/// 3. covered: reserve the funds and persist an `Authorized`
///    decision/outbox pair
/// 4. not covered: persist a `Declined` decision/outbox pair — a decline
///    is a committed business outcome, not a failure
///
/// Storage errors abort the scope entirely (nothing persisted) and surface
/// as retryable. The whole call is bounded by a wall-clock budget.
pub struct AuthorizationCoordinator<S, N> {
    store: S,
    notifier: Arc<N>,
    timeout: Duration,
}

impl<S, N> AuthorizationCoordinator<S, N>
where
    S: LedgerStore,
    N: NotificationService + 'static,
{
    /// Creates a coordinator with the default wall-clock budget.
    pub fn new(store: S, notifier: N) -> Self {
        Self::with_timeout(store, notifier, DEFAULT_AUTHORIZE_TIMEOUT)
    }

    /// Creates a coordinator with an explicit wall-clock budget.
    pub fn with_timeout(store: S, notifier: N, timeout: Duration) -> Self {
        Self {
            store,
            notifier: Arc::new(notifier),
            timeout,
        }
    }

    /// Authorizes a funds transfer from sender to receiver.
    #[tracing::instrument(skip(self), fields(sender = %request.sender, receiver = %request.receiver))]
    pub async fn authorize(&self, request: AuthorizationRequest) -> Result<Decision> {
        if !request.amount.is_positive() {
            return Err(AuthorizeError::Validation(format!(
                "amount must be strictly positive, got {}",
                request.amount
            )));
        }

        metrics::counter!("authorizations_total").increment(1);
        let started = std::time::Instant::now();

        let decision = match tokio::time::timeout(self.timeout, self.run_unit_of_work(request)).await
        {
            Ok(result) => result?,
            // The transaction scope is dropped un-committed, so the abort
            // leaves no partial state.
            Err(_) => {
                tracing::warn!(budget = ?self.timeout, "authorize aborted on timeout");
                return Err(AuthorizeError::Timeout(self.timeout));
            }
        };

        metrics::histogram!("authorize_duration_seconds").record(started.elapsed().as_secs_f64());
        if !decision.is_authorized() {
            metrics::counter!("authorizations_declined_total").increment(1);
        }

        tracing::info!(
            authorization_id = %decision.authorization_id,
            outbox_id = %decision.outbox_id,
            status = %decision.status,
            "authorization decided"
        );
        Ok(decision)
    }

    async fn run_unit_of_work(&self, request: AuthorizationRequest) -> Result<Decision> {
        let mut tx = self.store.begin(OperationCategory::Authorization).await?;

        let sender = tx.account(request.sender).await?;
        let receiver = tx.account(request.receiver).await?;
        let mut sender = match (sender, receiver) {
            (Some(sender), Some(_receiver)) => sender,
            (None, _) => {
                tx.rollback().await?;
                return Err(AuthorizeError::AccountNotFound(request.sender));
            }
            (_, None) => {
                tx.rollback().await?;
                return Err(AuthorizeError::AccountNotFound(request.receiver));
            }
        };

        let status = if sender.can_cover(request.amount) {
            sender.reserve(request.amount)?;
            tx.update_account(&sender).await?;
            OutboxStatus::Authorized
        } else {
            tracing::debug!(
                available = %sender.available(),
                requested = %request.amount,
                "declining: available balance does not cover amount"
            );
            OutboxStatus::Declined
        };

        let (authorization, outbox) =
            Authorization::decide(request.sender, request.receiver, request.amount, status);
        tx.insert_decision(&authorization, &outbox).await?;
        tx.commit().await?;

        if status == OutboxStatus::Authorized {
            self.spawn_notification(
                sender.contact().to_string(),
                sender.name().to_string(),
                request.amount,
            );
        }

        Ok(Decision {
            authorization_id: authorization.id,
            outbox_id: outbox.id,
            status,
        })
    }

    /// Fires the notification collaborator without awaiting it; the
    /// outcome is only logged.
    fn spawn_notification(&self, contact: String, account_name: String, amount: Amount) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let template = NotificationTemplate {
                account_name,
                amount,
            };
            if let Err(e) = notifier.notify(&contact, template).await {
                tracing::warn!(error = %e, "notification send failed");
            }
        });
    }
}
