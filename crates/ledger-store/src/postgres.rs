use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, Amount, AuthorizationId, OutboxId};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::account::Account;
use crate::error::{LedgerStoreError, Result};
use crate::isolation::OperationCategory;
use crate::outbox::{Authorization, Outbox, OutboxStatus};
use crate::store::{LedgerStore, LedgerTransaction};

/// PostgreSQL-backed ledger store.
///
/// Transaction scopes map to database transactions at the isolation level
/// the operation category requires; account reads inside a scope take a
/// row-level exclusive lock (`SELECT ... FOR UPDATE`), so no two scopes can
/// interleave a read-modify-write on the same account.
#[derive(Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Creates a new PostgreSQL ledger store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_account(row: PgRow) -> Result<Account> {
        Ok(Account::from_parts(
            AccountId::from_uuid(row.try_get::<Uuid, _>("id")?),
            row.try_get("name")?,
            row.try_get("account_type")?,
            row.try_get("contact")?,
            Amount::new(row.try_get::<Decimal, _>("balance")?),
            Amount::new(row.try_get::<Decimal, _>("reserved")?),
        ))
    }

    fn row_to_authorization(row: PgRow) -> Result<Authorization> {
        Ok(Authorization {
            id: AuthorizationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            sender: AccountId::from_uuid(row.try_get::<Uuid, _>("sender")?),
            receiver: AccountId::from_uuid(row.try_get::<Uuid, _>("receiver")?),
            amount: Amount::new(row.try_get::<Decimal, _>("amount")?),
            created_at: row.try_get("created_at")?,
            outbox_id: OutboxId::from_uuid(row.try_get::<Uuid, _>("outbox_id")?),
        })
    }

    fn row_to_outbox(row: PgRow) -> Result<Outbox> {
        let status_raw: String = row.try_get("status")?;
        let status = OutboxStatus::parse(&status_raw)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown status {status_raw}").into()))?;
        Ok(Outbox {
            id: OutboxId::from_uuid(row.try_get::<Uuid, _>("id")?),
            status,
            authorization_id: AuthorizationId::from_uuid(
                row.try_get::<Uuid, _>("authorization_id")?,
            ),
            created_at: row.try_get("created_at")?,
            dispatched_at: row.try_get("dispatched_at")?,
        })
    }
}

struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PostgresTransaction {
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, name, account_type, contact, balance, reserved \
             FROM accounts WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(PostgresLedgerStore::row_to_account).transpose()
    }

    async fn insert_account(&mut self, account: &Account) -> Result<()> {
        sqlx::query(
            "INSERT INTO accounts (id, name, account_type, contact, balance, reserved) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(account.id().as_uuid())
        .bind(account.name())
        .bind(account.account_type())
        .bind(account.contact())
        .bind(account.balance().as_decimal())
        .bind(account.reserved().as_decimal())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<()> {
        let result = sqlx::query(
            "UPDATE accounts SET name = $2, account_type = $3, contact = $4, \
             balance = $5, reserved = $6 WHERE id = $1",
        )
        .bind(account.id().as_uuid())
        .bind(account.name())
        .bind(account.account_type())
        .bind(account.contact())
        .bind(account.balance().as_decimal())
        .bind(account.reserved().as_decimal())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerStoreError::AccountNotFound(account.id()));
        }
        Ok(())
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_decision(
        &mut self,
        authorization: &Authorization,
        outbox: &Outbox,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO authorizations (id, sender, receiver, amount, created_at, outbox_id) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(authorization.id.as_uuid())
        .bind(authorization.sender.as_uuid())
        .bind(authorization.receiver.as_uuid())
        .bind(authorization.amount.as_decimal())
        .bind(authorization.created_at)
        .bind(authorization.outbox_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;

        sqlx::query(
            "INSERT INTO outboxes (id, status, authorization_id, created_at, dispatched_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(outbox.id.as_uuid())
        .bind(outbox.status.as_str())
        .bind(outbox.authorization_id.as_uuid())
        .bind(outbox.created_at)
        .bind(outbox.dispatched_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn pending_outboxes(&mut self, status: OutboxStatus) -> Result<Vec<OutboxId>> {
        let rows = sqlx::query(
            "SELECT id FROM outboxes \
             WHERE status = $1 AND dispatched_at IS NULL \
             ORDER BY created_at, id",
        )
        .bind(status.as_str())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|row| Ok(OutboxId::from_uuid(row.try_get::<Uuid, _>("id")?)))
            .collect()
    }

    async fn mark_dispatched(&mut self, id: OutboxId, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE outboxes SET dispatched_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerStoreError::OutboxNotFound(id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn begin(&self, category: OperationCategory) -> Result<Box<dyn LedgerTransaction>> {
        tracing::trace!(%category, isolation = %category.isolation(), "opening transaction");
        let mut tx = self.pool.begin().await?;
        sqlx::query(category.isolation().set_transaction_sql())
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, name, account_type, contact, balance, reserved \
             FROM accounts WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_account).transpose()
    }

    async fn get_authorization(&self, id: AuthorizationId) -> Result<Option<Authorization>> {
        let row = sqlx::query(
            "SELECT id, sender, receiver, amount, created_at, outbox_id \
             FROM authorizations WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_authorization).transpose()
    }

    async fn get_outbox(&self, id: OutboxId) -> Result<Option<Outbox>> {
        let row = sqlx::query(
            "SELECT id, status, authorization_id, created_at, dispatched_at \
             FROM outboxes WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_outbox).transpose()
    }
}
