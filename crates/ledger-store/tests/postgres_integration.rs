//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p ledger-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use ledger_store::{
    Account, AccountId, Amount, Authorization, LedgerStore, OperationCategory, OutboxStatus,
    PostgresLedgerStore,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for the schema
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_ledger_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresLedgerStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE outboxes, authorizations, accounts")
        .execute(&pool)
        .await
        .unwrap();

    PostgresLedgerStore::new(pool)
}

fn open_account(balance: Amount) -> Account {
    Account::open("Alice", "checking", "+15550100", balance)
}

#[tokio::test]
#[serial]
async fn account_roundtrip() {
    let store = get_test_store().await;
    let account = open_account(Amount::from_major_minor(100, 50));
    let id = account.id();

    let mut tx = store.begin(OperationCategory::Admin).await.unwrap();
    tx.insert_account(&account).await.unwrap();
    tx.commit().await.unwrap();

    let stored = store.get_account(id).await.unwrap().unwrap();
    assert_eq!(stored.balance(), Amount::from_major_minor(100, 50));
    assert_eq!(stored.reserved(), Amount::ZERO);
    assert_eq!(stored.contact(), "+15550100");
}

#[tokio::test]
#[serial]
async fn rollback_discards_mutation() {
    let store = get_test_store().await;
    let account = open_account(Amount::from_major_minor(100, 0));
    let id = account.id();

    let mut tx = store.begin(OperationCategory::Admin).await.unwrap();
    tx.insert_account(&account).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store
        .begin(OperationCategory::BalanceMutation)
        .await
        .unwrap();
    let mut stored = tx.account(id).await.unwrap().unwrap();
    stored.credit(Amount::from_major_minor(10, 0)).unwrap();
    tx.update_account(&stored).await.unwrap();
    tx.rollback().await.unwrap();

    let stored = store.get_account(id).await.unwrap().unwrap();
    assert_eq!(stored.balance(), Amount::from_major_minor(100, 0));
}

#[tokio::test]
#[serial]
async fn delete_unknown_account_reports_false() {
    let store = get_test_store().await;

    let mut tx = store.begin(OperationCategory::Admin).await.unwrap();
    let deleted = tx.delete_account(AccountId::new()).await.unwrap();
    tx.commit().await.unwrap();

    assert!(!deleted);
}

#[tokio::test]
#[serial]
async fn decision_and_pending_scan() {
    let store = get_test_store().await;

    let mut expected = Vec::new();
    for _ in 0..3 {
        let (auth, outbox) = Authorization::decide(
            AccountId::new(),
            AccountId::new(),
            Amount::from_major_minor(5, 0),
            OutboxStatus::Authorized,
        );
        let mut tx = store.begin(OperationCategory::Authorization).await.unwrap();
        tx.insert_decision(&auth, &outbox).await.unwrap();
        tx.commit().await.unwrap();
        expected.push(outbox.id);
        // Distinct created_at values keep the FIFO order deterministic.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let mut tx = store.begin(OperationCategory::DispatchScan).await.unwrap();
    let pending = tx.pending_outboxes(OutboxStatus::Authorized).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(pending, expected);

    let mut tx = store.begin(OperationCategory::DispatchScan).await.unwrap();
    tx.mark_dispatched(expected[0], Utc::now()).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin(OperationCategory::DispatchScan).await.unwrap();
    let pending = tx.pending_outboxes(OutboxStatus::Authorized).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(pending, &expected[1..]);

    let dispatched = store.get_outbox(expected[0]).await.unwrap().unwrap();
    assert!(dispatched.dispatched_at.is_some());
}

#[tokio::test]
#[serial]
async fn blocked_reserve_commits_after_lock_release() {
    let store = get_test_store().await;
    let account = open_account(Amount::from_major_minor(100, 0));
    let id = account.id();

    let mut tx = store.begin(OperationCategory::Admin).await.unwrap();
    tx.insert_account(&account).await.unwrap();
    tx.commit().await.unwrap();

    // First scope takes the row lock and reserves 30.00.
    let mut first = store.begin(OperationCategory::Authorization).await.unwrap();
    let mut locked = first.account(id).await.unwrap().unwrap();
    locked.reserve(Amount::from_major_minor(30, 0)).unwrap();
    first.update_account(&locked).await.unwrap();

    // Second scope blocks on the lock. Once the first commits it must
    // re-read the committed state and commit its own reservation, not
    // abort with a serialization failure.
    let second = {
        let store = store.clone();
        tokio::spawn(async move {
            let mut tx = store.begin(OperationCategory::Authorization).await.unwrap();
            let mut account = tx.account(id).await.unwrap().unwrap();
            account.reserve(Amount::from_major_minor(30, 0)).unwrap();
            tx.update_account(&account).await.unwrap();
            tx.commit().await.unwrap();
        })
    };

    // Give the second scope time to queue on the row lock.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    first.commit().await.unwrap();
    second.await.unwrap();

    let stored = store.get_account(id).await.unwrap().unwrap();
    assert_eq!(stored.reserved(), Amount::from_major_minor(60, 0));
}

#[tokio::test]
#[serial]
async fn concurrent_reserves_never_over_reserve() {
    let store = get_test_store().await;
    let account = open_account(Amount::from_major_minor(100, 0));
    let id = account.id();

    let mut tx = store.begin(OperationCategory::Admin).await.unwrap();
    tx.insert_account(&account).await.unwrap();
    tx.commit().await.unwrap();

    // 10 concurrent reservations of 30.00 against a balance of 100.00;
    // at most 3 can succeed.
    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut tx = store.begin(OperationCategory::Authorization).await.unwrap();
            let mut account = tx.account(id).await.unwrap().unwrap();
            match account.reserve(Amount::from_major_minor(30, 0)) {
                Ok(()) => {
                    tx.update_account(&account).await.unwrap();
                    tx.commit().await.unwrap();
                    true
                }
                Err(_) => {
                    tx.rollback().await.unwrap();
                    false
                }
            }
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 3);
    let stored = store.get_account(id).await.unwrap().unwrap();
    assert_eq!(stored.reserved(), Amount::from_major_minor(90, 0));
    assert!(stored.reserved() <= stored.balance());
}
