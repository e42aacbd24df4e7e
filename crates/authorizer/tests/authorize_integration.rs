//! End-to-end tests for the authorization unit of work.

use std::time::Duration;

use authorizer::{
    AccountService, AuthorizationCoordinator, AuthorizationRequest, InMemoryNotificationService,
};
use common::{AccountId, Amount};
use ledger_store::{InMemoryLedgerStore, LedgerStore, OutboxStatus};

struct TestHarness {
    store: InMemoryLedgerStore,
    accounts: AccountService<InMemoryLedgerStore>,
    coordinator: AuthorizationCoordinator<InMemoryLedgerStore, InMemoryNotificationService>,
    notifications: InMemoryNotificationService,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryLedgerStore::new();
        let notifications = InMemoryNotificationService::new();
        let accounts = AccountService::new(store.clone());
        let coordinator = AuthorizationCoordinator::new(store.clone(), notifications.clone());
        Self {
            store,
            accounts,
            coordinator,
            notifications,
        }
    }

    async fn open(&self, name: &str, balance: Amount) -> AccountId {
        self.accounts
            .open_account(name, "checking", "+15550100", balance)
            .await
            .unwrap()
            .id()
    }

    async fn authorize(&self, sender: AccountId, receiver: AccountId, amount: Amount) -> authorizer::Decision {
        self.coordinator
            .authorize(AuthorizationRequest {
                sender,
                receiver,
                amount,
            })
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn sufficient_balance_authorizes_and_reserves() {
    let h = TestHarness::new();
    let sender = h.open("Alice", Amount::from_major_minor(100, 0)).await;
    let receiver = h.open("Bob", Amount::ZERO).await;

    let decision = h
        .authorize(sender, receiver, Amount::from_major_minor(40, 0))
        .await;

    assert!(decision.is_authorized());

    let account = h.store.get_account(sender).await.unwrap().unwrap();
    assert_eq!(account.balance(), Amount::from_major_minor(100, 0));
    assert_eq!(account.reserved(), Amount::from_major_minor(40, 0));
    assert_eq!(account.available(), Amount::from_major_minor(60, 0));

    let outbox = h
        .store
        .get_outbox(decision.outbox_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outbox.status, OutboxStatus::Authorized);
    assert!(outbox.is_pending());

    let authorization = h
        .store
        .get_authorization(decision.authorization_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(authorization.outbox_id, outbox.id);
    assert_eq!(authorization.amount, Amount::from_major_minor(40, 0));
}

#[tokio::test]
async fn insufficient_available_balance_declines_and_commits() {
    let h = TestHarness::new();
    let sender = h.open("Alice", Amount::from_major_minor(100, 0)).await;
    let receiver = h.open("Bob", Amount::ZERO).await;

    // Reserve 90 so only 10 remains available.
    h.authorize(sender, receiver, Amount::from_major_minor(90, 0))
        .await;

    let decision = h
        .authorize(sender, receiver, Amount::from_major_minor(20, 0))
        .await;

    // A decline is a committed outcome, not an error.
    assert_eq!(decision.status, OutboxStatus::Declined);

    let account = h.store.get_account(sender).await.unwrap().unwrap();
    assert_eq!(account.balance(), Amount::from_major_minor(100, 0));
    assert_eq!(account.reserved(), Amount::from_major_minor(90, 0));

    let outbox = h
        .store
        .get_outbox(decision.outbox_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outbox.status, OutboxStatus::Declined);
}

#[tokio::test]
async fn notification_fires_only_for_authorized() {
    let h = TestHarness::new();
    let sender = h.open("Alice", Amount::from_major_minor(50, 0)).await;
    let receiver = h.open("Bob", Amount::ZERO).await;

    h.authorize(sender, receiver, Amount::from_major_minor(50, 0))
        .await;
    // Now nothing is available; this one declines.
    h.authorize(sender, receiver, Amount::from_major_minor(1, 0))
        .await;

    // The send runs in a spawned task; give it a moment.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let sent = h.notifications.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "+15550100");
    assert_eq!(sent[0].1.account_name, "Alice");
    assert_eq!(sent[0].1.amount, Amount::from_major_minor(50, 0));
}

#[tokio::test]
async fn notification_failure_does_not_affect_decision() {
    let h = TestHarness::new();
    h.notifications.set_fail_on_notify(true);
    let sender = h.open("Alice", Amount::from_major_minor(50, 0)).await;
    let receiver = h.open("Bob", Amount::ZERO).await;

    let decision = h
        .authorize(sender, receiver, Amount::from_major_minor(10, 0))
        .await;
    assert!(decision.is_authorized());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.notifications.sent_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_authorizations_never_over_reserve() {
    let h = TestHarness::new();
    let sender = h.open("Alice", Amount::from_major_minor(100, 0)).await;
    let receiver = h.open("Bob", Amount::ZERO).await;

    // 10 concurrent requests of 30.00 against a balance of 100.00: exactly
    // 3 can be authorized, the rest must be declined.
    let mut handles = Vec::new();
    for _ in 0..10 {
        let coordinator = AuthorizationCoordinator::new(
            h.store.clone(),
            InMemoryNotificationService::new(),
        );
        handles.push(tokio::spawn(async move {
            coordinator
                .authorize(AuthorizationRequest {
                    sender,
                    receiver,
                    amount: Amount::from_major_minor(30, 0),
                })
                .await
                .unwrap()
        }));
    }

    let mut authorized = 0;
    let mut declined = 0;
    for handle in handles {
        match handle.await.unwrap().status {
            OutboxStatus::Authorized => authorized += 1,
            OutboxStatus::Declined => declined += 1,
        }
    }

    assert_eq!(authorized, 3);
    assert_eq!(declined, 7);

    let account = h.store.get_account(sender).await.unwrap().unwrap();
    assert_eq!(account.reserved(), Amount::from_major_minor(90, 0));
    assert!(account.reserved() <= account.balance());

    // every request, authorized or declined, left an outbox entry
    assert_eq!(h.store.outbox_count().await, 10);
}

#[tokio::test]
async fn every_decision_is_an_independent_value() {
    let h = TestHarness::new();
    let sender = h.open("Alice", Amount::from_major_minor(100, 0)).await;
    let receiver = h.open("Bob", Amount::ZERO).await;

    let first = h
        .authorize(sender, receiver, Amount::from_major_minor(10, 0))
        .await;
    let second = h
        .authorize(sender, receiver, Amount::from_major_minor(10, 0))
        .await;

    assert_ne!(first.authorization_id, second.authorization_id);
    assert_ne!(first.outbox_id, second.outbox_id);
}
