//! SQLite store on an `sqlx` pool.
//!
//! Nested values (purchase units, application context, payer) are stored as
//! JSON text; timestamps are Unix milliseconds.

use super::{
    CaptureClaims, IntentJournal, OrderFilter, OrderRepository, TransactionFilter,
    TransactionRepository,
};
use crate::error::{PaymentError, PaymentResult};
use crate::order::{
    IntentId, IntentStatus, NewOrder, Order, OrderId, OrderIntent, OrderUpdate, OwnerId,
};
use crate::transaction::{GatewayStatus, NewTransaction, Transaction, TransactionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteQueryResult, SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;
use tracing::info;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        gateway_order_id TEXT NOT NULL UNIQUE,
        intent TEXT NOT NULL,
        purchase_units TEXT NOT NULL,
        application_context TEXT NOT NULL,
        status TEXT NOT NULL,
        captured_at INTEGER,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS order_owners (
        order_id INTEGER NOT NULL,
        owner_id INTEGER NOT NULL,
        PRIMARY KEY (order_id, owner_id)
    )",
    "CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        gateway_order_id TEXT NOT NULL,
        payer TEXT NOT NULL,
        purchase_units TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_transactions_gateway_order
        ON transactions (gateway_order_id)",
    "CREATE TABLE IF NOT EXISTS capture_claims (
        gateway_order_id TEXT PRIMARY KEY,
        claimed_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS order_intents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        status TEXT NOT NULL,
        gateway_order_id TEXT,
        order_id INTEGER,
        failure TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
];

const ORDER_COLUMNS: &str = "id, gateway_order_id, intent, purchase_units, application_context, \
     status, captured_at, created_at";

const TRANSACTION_COLUMNS: &str =
    "id, gateway_order_id, payer, purchase_units, status, created_at";

const INTENT_COLUMNS: &str =
    "id, status, gateway_order_id, order_id, failure, created_at, updated_at";

/// Store backed by a SQLite database
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and apply the schema
    pub async fn connect(url: &str) -> PaymentResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| PaymentError::Configuration(format!("Invalid DATABASE_URL: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| PaymentError::Configuration(format!("Failed to open database: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!(url = %url, "SQLite store ready");
        Ok(store)
    }

    /// Private in-memory database on a single long-lived connection
    pub async fn in_memory() -> PaymentResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| PaymentError::Configuration(format!("Failed to open database: {e}")))?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and apply the schema
    pub async fn from_pool(pool: SqlitePool) -> PaymentResult<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables if they do not exist
    pub async fn migrate(&self) -> PaymentResult<()> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&self.pool)
                .await
                .map_err(write_err)?;
        }
        Ok(())
    }
}

fn write_err(err: sqlx::Error) -> PaymentError {
    PaymentError::StoreWrite(err.to_string())
}

fn read_err(err: sqlx::Error) -> PaymentError {
    PaymentError::Internal(format!("store read failed: {err}"))
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> PaymentResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| PaymentError::Internal(format!("timestamp out of range: {ms}")))
}

fn order_from_row(row: &SqliteRow) -> PaymentResult<Order> {
    let intent: String = row.try_get("intent").map_err(read_err)?;
    let units: String = row.try_get("purchase_units").map_err(read_err)?;
    let context: String = row.try_get("application_context").map_err(read_err)?;
    let status: String = row.try_get("status").map_err(read_err)?;
    let captured_at: Option<i64> = row.try_get("captured_at").map_err(read_err)?;
    let created_at: i64 = row.try_get("created_at").map_err(read_err)?;

    Ok(Order {
        id: row.try_get("id").map_err(read_err)?,
        gateway_order_id: row.try_get("gateway_order_id").map_err(read_err)?,
        intent: intent.parse()?,
        purchase_units: serde_json::from_str(&units)?,
        application_context: serde_json::from_str(&context)?,
        status: status.parse()?,
        captured_at: captured_at.map(from_millis).transpose()?,
        created_at: from_millis(created_at)?,
    })
}

fn transaction_from_row(row: &SqliteRow) -> PaymentResult<Transaction> {
    let payer: String = row.try_get("payer").map_err(read_err)?;
    let units: String = row.try_get("purchase_units").map_err(read_err)?;
    let status: String = row.try_get("status").map_err(read_err)?;
    let created_at: i64 = row.try_get("created_at").map_err(read_err)?;

    Ok(Transaction {
        id: row.try_get("id").map_err(read_err)?,
        gateway_order_id: row.try_get("gateway_order_id").map_err(read_err)?,
        payer: serde_json::from_str(&payer)?,
        purchase_units: serde_json::from_str(&units)?,
        status: GatewayStatus::parse(&status),
        created_at: from_millis(created_at)?,
    })
}

fn intent_from_row(row: &SqliteRow) -> PaymentResult<OrderIntent> {
    let status: String = row.try_get("status").map_err(read_err)?;
    let created_at: i64 = row.try_get("created_at").map_err(read_err)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(read_err)?;

    Ok(OrderIntent {
        id: row.try_get("id").map_err(read_err)?,
        status: IntentStatus::from_str(&status)?,
        gateway_order_id: row.try_get("gateway_order_id").map_err(read_err)?,
        order_id: row.try_get("order_id").map_err(read_err)?,
        failure: row.try_get("failure").map_err(read_err)?,
        created_at: from_millis(created_at)?,
        updated_at: from_millis(updated_at)?,
    })
}

#[async_trait]
impl OrderRepository for SqliteStore {
    async fn create_order(&self, order: NewOrder) -> PaymentResult<Order> {
        // millisecond precision, matching what a later read returns
        let created_at = from_millis(to_millis(Utc::now()))?;
        let units = serde_json::to_string(&order.purchase_units)?;
        let context = serde_json::to_string(&order.application_context)?;

        let result = sqlx::query(
            "INSERT INTO orders (gateway_order_id, intent, purchase_units, application_context, status, captured_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)",
        )
        .bind(&order.gateway_order_id)
        .bind(order.intent.as_str())
        .bind(units)
        .bind(context)
        .bind(order.status.as_str())
        .bind(to_millis(created_at))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(order.into_order(result.last_insert_rowid(), created_at))
    }

    async fn find_order(&self, id: OrderId) -> PaymentResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_err)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn find_order_by_gateway_id(
        &self,
        gateway_order_id: &str,
    ) -> PaymentResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE gateway_order_id = ?1");
        let row = sqlx::query(&sql)
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_err)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn order_exists(&self, id: OrderId) -> PaymentResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(read_err)?;
        Ok(count > 0)
    }

    async fn update_order(&self, id: OrderId, update: &OrderUpdate) -> PaymentResult<Order> {
        let mut tx = self.pool.begin().await.map_err(write_err)?;

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(read_err)?
            .ok_or_else(|| PaymentError::OrderNotFound { id: id.to_string() })?;

        let mut order = order_from_row(&row)?;
        order.apply(update)?;

        sqlx::query(
            "UPDATE orders SET intent = ?1, purchase_units = ?2, application_context = ?3,
             status = ?4, captured_at = ?5 WHERE id = ?6",
        )
        .bind(order.intent.as_str())
        .bind(serde_json::to_string(&order.purchase_units)?)
        .bind(serde_json::to_string(&order.application_context)?)
        .bind(order.status.as_str())
        .bind(order.captured_at.map(to_millis))
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        tx.commit().await.map_err(write_err)?;
        Ok(order)
    }

    async fn delete_order(&self, id: OrderId) -> PaymentResult<()> {
        let mut tx = self.pool.begin().await.map_err(write_err)?;

        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        if result.rows_affected() == 0 {
            return Err(PaymentError::OrderNotFound { id: id.to_string() });
        }

        sqlx::query("DELETE FROM order_owners WHERE order_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

        tx.commit().await.map_err(write_err)
    }

    async fn find_orders(&self, filter: &OrderFilter) -> PaymentResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o
             WHERE (?1 IS NULL OR o.status = ?1)
               AND (?2 IS NULL OR EXISTS (
                    SELECT 1 FROM order_owners w WHERE w.order_id = o.id AND w.owner_id = ?2))
             ORDER BY o.id"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(read_err)?;
        rows.iter().map(order_from_row).collect()
    }

    async fn link_owner(&self, order_id: OrderId, owner_id: OwnerId) -> PaymentResult<()> {
        if !self.order_exists(order_id).await? {
            return Err(PaymentError::OrderNotFound {
                id: order_id.to_string(),
            });
        }

        sqlx::query("INSERT OR IGNORE INTO order_owners (order_id, owner_id) VALUES (?1, ?2)")
            .bind(order_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for SqliteStore {
    async fn create_transaction(&self, transaction: NewTransaction) -> PaymentResult<Transaction> {
        let created_at = from_millis(to_millis(Utc::now()))?;

        let result = sqlx::query(
            "INSERT INTO transactions (gateway_order_id, payer, purchase_units, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&transaction.gateway_order_id)
        .bind(serde_json::to_string(&transaction.payer)?)
        .bind(serde_json::to_string(&transaction.purchase_units)?)
        .bind(transaction.status.as_str())
        .bind(to_millis(created_at))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(transaction.into_transaction(result.last_insert_rowid(), created_at))
    }

    async fn find_transaction(&self, id: TransactionId) -> PaymentResult<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_err)?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn find_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> PaymentResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE (?1 IS NULL OR gateway_order_id = ?1) ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.gateway_order_id.as_deref())
            .fetch_all(&self.pool)
            .await
            .map_err(read_err)?;
        rows.iter().map(transaction_from_row).collect()
    }
}

#[async_trait]
impl CaptureClaims for SqliteStore {
    async fn claim_capture(&self, gateway_order_id: &str) -> PaymentResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO capture_claims (gateway_order_id, claimed_at) VALUES (?1, ?2)",
        )
        .bind(gateway_order_id)
        .bind(to_millis(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_capture(&self, gateway_order_id: &str) -> PaymentResult<()> {
        sqlx::query("DELETE FROM capture_claims WHERE gateway_order_id = ?1")
            .bind(gateway_order_id)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(())
    }
}

fn journal_touched(id: IntentId, result: SqliteQueryResult) -> PaymentResult<()> {
    if result.rows_affected() == 0 {
        return Err(PaymentError::Internal(format!("no journal entry {id}")));
    }
    Ok(())
}

#[async_trait]
impl IntentJournal for SqliteStore {
    async fn begin_intent(&self) -> PaymentResult<OrderIntent> {
        let now = from_millis(to_millis(Utc::now()))?;
        let result = sqlx::query(
            "INSERT INTO order_intents (status, created_at, updated_at) VALUES (?1, ?2, ?2)",
        )
        .bind(IntentStatus::PendingRemote.as_str())
        .bind(to_millis(now))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(OrderIntent {
            id: result.last_insert_rowid(),
            status: IntentStatus::PendingRemote,
            gateway_order_id: None,
            order_id: None,
            failure: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn record_remote(&self, id: IntentId, gateway_order_id: &str) -> PaymentResult<()> {
        let result = sqlx::query(
            "UPDATE order_intents SET gateway_order_id = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(gateway_order_id.to_string())
        .bind(to_millis(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        journal_touched(id, result)
    }

    async fn resolve_intent(&self, id: IntentId, order_id: OrderId) -> PaymentResult<()> {
        let result = sqlx::query(
            "UPDATE order_intents SET status = ?1, order_id = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(IntentStatus::Created.as_str())
        .bind(order_id)
        .bind(to_millis(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        journal_touched(id, result)
    }

    async fn fail_intent(&self, id: IntentId, reason: &str) -> PaymentResult<()> {
        let result = sqlx::query(
            "UPDATE order_intents SET status = ?1, failure = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(IntentStatus::Failed.as_str())
        .bind(reason.to_string())
        .bind(to_millis(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        journal_touched(id, result)
    }

    async fn unresolved_intents(&self) -> PaymentResult<Vec<OrderIntent>> {
        let sql =
            format!("SELECT {INTENT_COLUMNS} FROM order_intents WHERE status = ?1 ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(IntentStatus::PendingRemote.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(read_err)?;
        rows.iter().map(intent_from_row).collect()
    }
}
