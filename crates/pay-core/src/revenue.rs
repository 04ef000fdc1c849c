//! # Revenue Aggregator
//!
//! Read-only statistics over COMPLETED orders linked to an owner. Malformed
//! historical amounts count as zero instead of failing the report; a total
//! that overflows `Decimal` is reported as `Internal`.

use crate::error::{PaymentError, PaymentResult};
use crate::order::{Order, OwnerId};
use crate::store::{OrderFilter, OrderRepository, SharedStore};
use chrono::Datelike;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{instrument, warn};

/// Totals for one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_revenue: Decimal,
    pub total_orders: u64,
}

/// Revenue captured in one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    /// English month name, e.g. "March"
    pub month: String,
    pub revenue: Decimal,
}

/// Computes revenue statistics from persisted orders
#[derive(Clone)]
pub struct RevenueAggregator {
    store: SharedStore,
}

impl RevenueAggregator {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    async fn completed_orders(&self, owner_id: OwnerId) -> PaymentResult<Vec<Order>> {
        self.store
            .find_orders(&OrderFilter::completed_for(owner_id))
            .await
    }

    #[instrument(skip(self))]
    pub async fn order_stats(&self, owner_id: OwnerId) -> PaymentResult<OrderStats> {
        let orders = self.completed_orders(owner_id).await?;
        let total_revenue = orders
            .iter()
            .try_fold(Decimal::ZERO, |acc, order| acc.checked_add(order.total()?))
            .ok_or_else(|| overflow(owner_id))?;

        Ok(OrderStats {
            total_revenue,
            total_orders: orders.len() as u64,
        })
    }

    /// One entry per month that has at least one captured order, in calendar
    /// order. Months from different years share a bucket.
    #[instrument(skip(self))]
    pub async fn monthly_revenue(&self, owner_id: OwnerId) -> PaymentResult<Vec<MonthlyRevenue>> {
        let orders = self.completed_orders(owner_id).await?;
        bucket_by_month(&orders).ok_or_else(|| overflow(owner_id))
    }
}

fn overflow(owner_id: OwnerId) -> PaymentError {
    warn!(owner_id, "Revenue total overflows");
    PaymentError::Internal(format!("revenue total for owner {} overflows", owner_id))
}

/// `None` when a bucket overflows
fn bucket_by_month(orders: &[Order]) -> Option<Vec<MonthlyRevenue>> {
    let mut buckets: BTreeMap<u32, (String, Decimal)> = BTreeMap::new();

    for order in orders {
        let Some(captured_at) = order.captured_at else {
            continue;
        };
        let entry = buckets
            .entry(captured_at.month())
            .or_insert_with(|| (captured_at.format("%B").to_string(), Decimal::ZERO));
        entry.1 = entry.1.checked_add(order.total()?)?;
    }

    Some(
        buckets
            .into_values()
            .map(|(month, revenue)| MonthlyRevenue { month, revenue })
            .collect(),
    )
}
