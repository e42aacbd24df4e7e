//! Authorization decisions and their outbox entries.
//!
//! An `Authorization` and its `Outbox` entry are always created together in
//! one transaction and linked by id in both directions. Neither is ever
//! created on its own, and an authorization is immutable once written.

use chrono::{DateTime, Utc};
use common::{AccountId, Amount, AuthorizationId, OutboxId};
use serde::{Deserialize, Serialize};

/// Outcome recorded for an authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboxStatus {
    Authorized,
    Declined,
}

impl OutboxStatus {
    /// Stable wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Authorized => "AUTHORIZED",
            OutboxStatus::Declined => "DECLINED",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AUTHORIZED" => Some(OutboxStatus::Authorized),
            "DECLINED" => Some(OutboxStatus::Declined),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded authorization decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorization {
    pub id: AuthorizationId,
    pub sender: AccountId,
    pub receiver: AccountId,
    pub amount: Amount,
    /// Assigned server-side when the request is received, never
    /// client-supplied.
    pub created_at: DateTime<Utc>,
    pub outbox_id: OutboxId,
}

/// An outbox entry awaiting (or past) dispatch to the downstream queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outbox {
    pub id: OutboxId,
    pub status: OutboxStatus,
    pub authorization_id: AuthorizationId,
    pub created_at: DateTime<Utc>,
    /// Set once a dispatch cycle has delivered this entry to the queue.
    /// Pending scans only consider entries where this is `None`, so a
    /// delivered entry is never rediscovered by a later cycle.
    pub dispatched_at: Option<DateTime<Utc>>,
}

impl Authorization {
    /// Builds the authorization/outbox pair for a decision.
    ///
    /// Both records carry the same creation timestamp and reference each
    /// other by id.
    pub fn decide(
        sender: AccountId,
        receiver: AccountId,
        amount: Amount,
        status: OutboxStatus,
    ) -> (Authorization, Outbox) {
        let now = Utc::now();
        let authorization_id = AuthorizationId::new();
        let outbox_id = OutboxId::new();

        let authorization = Authorization {
            id: authorization_id,
            sender,
            receiver,
            amount,
            created_at: now,
            outbox_id,
        };
        let outbox = Outbox {
            id: outbox_id,
            status,
            authorization_id,
            created_at: now,
            dispatched_at: None,
        };
        (authorization, outbox)
    }
}

impl Outbox {
    /// True if the entry has not yet been delivered to the queue.
    pub fn is_pending(&self) -> bool {
        self.dispatched_at.is_none()
    }
}
