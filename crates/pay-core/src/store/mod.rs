//! # Order Repository
//!
//! Durable storage for orders, transactions, capture claims and the
//! create-order journal. Each trait covers one record family; `OrderStore`
//! bundles them for the engine.
//!
//! Implementations:
//! - [`MemoryStore`] for tests and single-process deployments
//! - [`SqliteStore`] backed by an `sqlx` SQLite pool

use crate::error::PaymentResult;
use crate::order::{
    IntentId, NewOrder, Order, OrderId, OrderIntent, OrderStatus, OrderUpdate, OwnerId,
};
use crate::transaction::{NewTransaction, Transaction, TransactionId};
use async_trait::async_trait;
use std::sync::Arc;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Selects orders for scans
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub owner_id: Option<OwnerId>,
}

impl OrderFilter {
    /// Completed orders linked to an owner (revenue scans)
    pub fn completed_for(owner_id: OwnerId) -> Self {
        Self {
            status: Some(OrderStatus::Completed),
            owner_id: Some(owner_id),
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.status.map_or(true, |status| order.status == status)
    }
}

/// Selects transactions for scans
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub gateway_order_id: Option<String>,
}

/// Orders, keyed by internal id and by gateway order id
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order and assign its id
    async fn create_order(&self, order: NewOrder) -> PaymentResult<Order>;

    async fn find_order(&self, id: OrderId) -> PaymentResult<Option<Order>>;

    async fn find_order_by_gateway_id(&self, gateway_order_id: &str)
        -> PaymentResult<Option<Order>>;

    async fn order_exists(&self, id: OrderId) -> PaymentResult<bool>;

    /// Apply an update atomically. Fails with `OrderNotFound` or
    /// `InvalidTransition` and leaves the record untouched.
    async fn update_order(&self, id: OrderId, update: &OrderUpdate) -> PaymentResult<Order>;

    /// Remove an order and its owner links
    async fn delete_order(&self, id: OrderId) -> PaymentResult<()>;

    async fn find_orders(&self, filter: &OrderFilter) -> PaymentResult<Vec<Order>>;

    /// Associate an order with the owner of the cart it came from
    async fn link_owner(&self, order_id: OrderId, owner_id: OwnerId) -> PaymentResult<()>;
}

/// Transactions are append-only
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create_transaction(&self, transaction: NewTransaction) -> PaymentResult<Transaction>;

    async fn find_transaction(&self, id: TransactionId) -> PaymentResult<Option<Transaction>>;

    async fn find_transactions(&self, filter: &TransactionFilter)
        -> PaymentResult<Vec<Transaction>>;
}

/// Uniqueness guard on capture, keyed by gateway order id
#[async_trait]
pub trait CaptureClaims: Send + Sync {
    /// Atomically claim the capture. `false` if a claim already exists.
    async fn claim_capture(&self, gateway_order_id: &str) -> PaymentResult<bool>;

    /// Drop a claim after a failed remote capture
    async fn release_capture(&self, gateway_order_id: &str) -> PaymentResult<()>;
}

/// Journal of create-order attempts
#[async_trait]
pub trait IntentJournal: Send + Sync {
    /// Record an attempt in `PENDING_REMOTE` before the gateway is contacted
    async fn begin_intent(&self) -> PaymentResult<OrderIntent>;

    /// The gateway created the order
    async fn record_remote(&self, id: IntentId, gateway_order_id: &str) -> PaymentResult<()>;

    /// The local order was written
    async fn resolve_intent(&self, id: IntentId, order_id: OrderId) -> PaymentResult<()>;

    /// The gateway call failed
    async fn fail_intent(&self, id: IntentId, reason: &str) -> PaymentResult<()>;

    /// Attempts still in `PENDING_REMOTE`
    async fn unresolved_intents(&self) -> PaymentResult<Vec<OrderIntent>>;
}

/// Everything the engine needs from storage
pub trait OrderStore: OrderRepository + TransactionRepository + CaptureClaims + IntentJournal {}

impl<T> OrderStore for T where
    T: OrderRepository + TransactionRepository + CaptureClaims + IntentJournal
{
}

/// Type alias for a shared store (dynamic dispatch)
pub type SharedStore = Arc<dyn OrderStore>;
