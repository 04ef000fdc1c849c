//! In-memory store, used by tests and single-process deployments.

use super::{
    CaptureClaims, IntentJournal, OrderFilter, OrderRepository, TransactionFilter,
    TransactionRepository,
};
use crate::error::{PaymentError, PaymentResult};
use crate::order::{
    IntentId, IntentStatus, NewOrder, Order, OrderId, OrderIntent, OrderUpdate, OwnerId,
};
use crate::transaction::{NewTransaction, Transaction, TransactionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    orders: BTreeMap<OrderId, Order>,
    owners: BTreeSet<(OrderId, OwnerId)>,
    transactions: BTreeMap<TransactionId, Transaction>,
    claims: HashMap<String, DateTime<Utc>>,
    intents: BTreeMap<IntentId, OrderIntent>,
    last_order_id: OrderId,
    last_transaction_id: TransactionId,
    last_intent_id: IntentId,
}

/// Store keeping every table behind one `RwLock`
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make order and transaction writes fail with `StoreWrite`.
    /// Claims and the journal keep working.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> PaymentResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PaymentError::StoreWrite("store is rejecting writes".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create_order(&self, order: NewOrder) -> PaymentResult<Order> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;

        if tables
            .orders
            .values()
            .any(|o| o.gateway_order_id == order.gateway_order_id)
        {
            return Err(PaymentError::StoreWrite(format!(
                "gateway order {} is already recorded",
                order.gateway_order_id
            )));
        }

        tables.last_order_id += 1;
        let order = order.into_order(tables.last_order_id, Utc::now());
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_order(&self, id: OrderId) -> PaymentResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn find_order_by_gateway_id(
        &self,
        gateway_order_id: &str,
    ) -> PaymentResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .find(|o| o.gateway_order_id == gateway_order_id)
            .cloned())
    }

    async fn order_exists(&self, id: OrderId) -> PaymentResult<bool> {
        Ok(self.tables.read().await.orders.contains_key(&id))
    }

    async fn update_order(&self, id: OrderId, update: &OrderUpdate) -> PaymentResult<Order> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;

        let current = tables
            .orders
            .get(&id)
            .ok_or_else(|| PaymentError::OrderNotFound { id: id.to_string() })?;

        let mut next = current.clone();
        next.apply(update)?;
        tables.orders.insert(id, next.clone());
        Ok(next)
    }

    async fn delete_order(&self, id: OrderId) -> PaymentResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;

        if tables.orders.remove(&id).is_none() {
            return Err(PaymentError::OrderNotFound { id: id.to_string() });
        }
        tables.owners.retain(|(order_id, _)| *order_id != id);
        Ok(())
    }

    async fn find_orders(&self, filter: &OrderFilter) -> PaymentResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .filter(|o| {
                filter
                    .owner_id
                    .map_or(true, |owner| tables.owners.contains(&(o.id, owner)))
            })
            .cloned()
            .collect())
    }

    async fn link_owner(&self, order_id: OrderId, owner_id: OwnerId) -> PaymentResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;

        if !tables.orders.contains_key(&order_id) {
            return Err(PaymentError::OrderNotFound {
                id: order_id.to_string(),
            });
        }
        tables.owners.insert((order_id, owner_id));
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn create_transaction(&self, transaction: NewTransaction) -> PaymentResult<Transaction> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;

        tables.last_transaction_id += 1;
        let transaction = transaction.into_transaction(tables.last_transaction_id, Utc::now());
        tables
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn find_transaction(&self, id: TransactionId) -> PaymentResult<Option<Transaction>> {
        Ok(self.tables.read().await.transactions.get(&id).cloned())
    }

    async fn find_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> PaymentResult<Vec<Transaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .values()
            .filter(|t| {
                filter
                    .gateway_order_id
                    .as_deref()
                    .map_or(true, |id| t.gateway_order_id == id)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CaptureClaims for MemoryStore {
    async fn claim_capture(&self, gateway_order_id: &str) -> PaymentResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.claims.contains_key(gateway_order_id) {
            return Ok(false);
        }
        tables
            .claims
            .insert(gateway_order_id.to_string(), Utc::now());
        Ok(true)
    }

    async fn release_capture(&self, gateway_order_id: &str) -> PaymentResult<()> {
        self.tables.write().await.claims.remove(gateway_order_id);
        Ok(())
    }
}

impl Tables {
    fn intent_mut(&mut self, id: IntentId) -> PaymentResult<&mut OrderIntent> {
        self.intents
            .get_mut(&id)
            .ok_or_else(|| PaymentError::Internal(format!("no journal entry {}", id)))
    }
}

#[async_trait]
impl IntentJournal for MemoryStore {
    async fn begin_intent(&self) -> PaymentResult<OrderIntent> {
        let mut tables = self.tables.write().await;
        tables.last_intent_id += 1;

        let now = Utc::now();
        let intent = OrderIntent {
            id: tables.last_intent_id,
            status: IntentStatus::PendingRemote,
            gateway_order_id: None,
            order_id: None,
            failure: None,
            created_at: now,
            updated_at: now,
        };
        tables.intents.insert(intent.id, intent.clone());
        Ok(intent)
    }

    async fn record_remote(&self, id: IntentId, gateway_order_id: &str) -> PaymentResult<()> {
        let mut tables = self.tables.write().await;
        let intent = tables.intent_mut(id)?;
        intent.gateway_order_id = Some(gateway_order_id.to_string());
        intent.updated_at = Utc::now();
        Ok(())
    }

    async fn resolve_intent(&self, id: IntentId, order_id: OrderId) -> PaymentResult<()> {
        let mut tables = self.tables.write().await;
        let intent = tables.intent_mut(id)?;
        intent.status = IntentStatus::Created;
        intent.order_id = Some(order_id);
        intent.updated_at = Utc::now();
        Ok(())
    }

    async fn fail_intent(&self, id: IntentId, reason: &str) -> PaymentResult<()> {
        let mut tables = self.tables.write().await;
        let intent = tables.intent_mut(id)?;
        intent.status = IntentStatus::Failed;
        intent.failure = Some(reason.to_string());
        intent.updated_at = Utc::now();
        Ok(())
    }

    async fn unresolved_intents(&self) -> PaymentResult<Vec<OrderIntent>> {
        let tables = self.tables.read().await;
        Ok(tables
            .intents
            .values()
            .filter(|i| i.status == IntentStatus::PendingRemote)
            .cloned()
            .collect())
    }
}
