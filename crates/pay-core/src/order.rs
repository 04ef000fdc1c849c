//! # Order Types
//!
//! The local, authoritative record of a purchase intent and its lifecycle.

use crate::error::{PaymentError, PaymentResult};
use crate::money::{truncate_text, Amount};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Internal order identifier (assigned by the repository)
pub type OrderId = i64;

/// Identifier of the user owning the cart an order was placed from
pub type OwnerId = i64;

/// What the gateway should do once the payer approves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// Capture the funds immediately after approval
    #[default]
    Capture,
    /// Authorize now, capture later
    Authorize,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Capture => "CAPTURE",
            Intent::Authorize => "AUTHORIZE",
        }
    }
}

impl FromStr for Intent {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CAPTURE" => Ok(Intent::Capture),
            "AUTHORIZE" => Ok(Intent::Authorize),
            other => Err(PaymentError::Validation(format!(
                "intent must be CAPTURE or AUTHORIZE, got {:?}",
                other
            ))),
        }
    }
}

/// Local order lifecycle.
///
/// ```text
/// CREATED ──► APPROVED ──► COMPLETED
///    │            │
///    └────────────┴──► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Created,
    Approved,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle forward-only.
    /// Staying in place is allowed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (a, b) if *a == b => true,
            (Created, Approved | Completed | Cancelled) => true,
            (Approved, Completed | Cancelled) => true,
            _ => false,
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATED" => Ok(OrderStatus::Created),
            "APPROVED" => Ok(OrderStatus::Approved),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(PaymentError::Validation(format!(
                "unknown order status {:?}",
                other
            ))),
        }
    }
}

/// Shapes the payer's experience on the gateway's approval page.
/// Stored verbatim alongside the order for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,

    pub brand_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landing_page: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_preference: Option<String>,
}

/// A line item inside a purchase unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Display name, at most 127 characters
    pub name: String,

    /// Price of a single unit
    pub unit_amount: Amount,

    /// Always positive
    pub quantity: u32,

    /// At most 127 characters, empty when absent
    #[serde(default)]
    pub description: String,
}

impl LineItem {
    /// unit_amount × quantity, `None` if the unit amount is malformed or
    /// the product overflows
    pub fn total(&self) -> Option<Decimal> {
        self.unit_amount
            .decimal()?
            .checked_mul(Decimal::from(self.quantity))
    }
}

/// One logical grouping of items and an amount within an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseUnit {
    /// Unique within one order
    pub reference_id: String,

    pub amount: Amount,

    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl PurchaseUnit {
    /// Apply the gateway's shape rules: truncate item text and synthesize a
    /// reference id when missing. Normalizing twice yields the same unit.
    pub fn normalize(mut self, index: usize, stamp_millis: i64) -> Self {
        if self.reference_id.trim().is_empty() {
            self.reference_id = format!("ref_{}_{}", index, stamp_millis);
        }
        for item in &mut self.items {
            item.name = truncate_text(&item.name);
            item.description = truncate_text(&item.description);
        }
        self
    }

    /// Σ item totals, `None` if there are no items, one is malformed, or
    /// the sum overflows
    pub fn items_total(&self) -> Option<Decimal> {
        if self.items.is_empty() {
            return None;
        }
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.total()?))
    }
}

/// Persisted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,

    /// Assigned by the gateway at creation, never mutated
    pub gateway_order_id: String,

    pub intent: Intent,

    pub purchase_units: Vec<PurchaseUnit>,

    pub application_context: ApplicationContext,

    pub status: OrderStatus,

    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Apply an update in place, refusing status regressions
    pub fn apply(&mut self, update: &OrderUpdate) -> PaymentResult<()> {
        if let Some(next) = update.status {
            if !self.status.can_transition_to(next) {
                return Err(PaymentError::InvalidTransition {
                    from: self.status.to_string(),
                    to: next.to_string(),
                });
            }
        }

        if let Some(intent) = update.intent {
            self.intent = intent;
        }
        if let Some(units) = &update.purchase_units {
            self.purchase_units = units.clone();
        }
        if let Some(context) = &update.application_context {
            self.application_context = context.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(at) = update.captured_at {
            self.captured_at = Some(at);
        }
        Ok(())
    }

    /// Sum of purchase unit amounts; malformed values count as zero.
    /// `None` when the sum overflows.
    pub fn total(&self) -> Option<Decimal> {
        self.purchase_units
            .iter()
            .filter_map(|unit| unit.amount.decimal())
            .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
    }
}

/// Order data written by the repository's `create`
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub gateway_order_id: String,
    pub intent: Intent,
    pub purchase_units: Vec<PurchaseUnit>,
    pub application_context: ApplicationContext,
    pub status: OrderStatus,
}

impl NewOrder {
    pub fn into_order(self, id: OrderId, created_at: DateTime<Utc>) -> Order {
        Order {
            id,
            gateway_order_id: self.gateway_order_id,
            intent: self.intent,
            purchase_units: self.purchase_units,
            application_context: self.application_context,
            status: self.status,
            captured_at: None,
            created_at,
        }
    }
}

/// Partial update of an order's local metadata.
/// There is no `gateway_order_id` field: it is fixed at creation.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub intent: Option<Intent>,
    pub purchase_units: Option<Vec<PurchaseUnit>>,
    pub application_context: Option<ApplicationContext>,
    pub status: Option<OrderStatus>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl OrderUpdate {
    /// Mark an order captured at the given instant
    pub fn completed_at(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(OrderStatus::Completed),
            captured_at: Some(at),
            ..Self::default()
        }
    }

    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Result of `createOrder`: the persisted order plus where to send the payer
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    #[serde(flatten)]
    pub order: Order,

    /// Gateway approval page, `None` when the gateway sent no `approve` link
    pub approval_link: Option<String>,
}

// =============================================================================
// Reconciliation journal
// =============================================================================

/// Journal entry identifier
pub type IntentId = i64;

/// State of a create-order attempt as seen by the local journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    /// Written before the gateway call; stays here if the local order write fails
    PendingRemote,
    /// Gateway order exists and the local order was written
    Created,
    /// The gateway call failed, nothing exists remotely
    Failed,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::PendingRemote => "PENDING_REMOTE",
            IntentStatus::Created => "CREATED",
            IntentStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for IntentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_REMOTE" => Ok(IntentStatus::PendingRemote),
            "CREATED" => Ok(IntentStatus::Created),
            "FAILED" => Ok(IntentStatus::Failed),
            other => Err(PaymentError::Internal(format!(
                "unknown intent status {:?}",
                other
            ))),
        }
    }
}

/// A create-order attempt, recorded so orphaned remote orders can be found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub id: IntentId,
    pub status: IntentStatus,
    pub gateway_order_id: Option<String>,
    pub order_id: Option<OrderId>,
    pub failure: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderIntent {
    /// A remote order exists but no local order was recorded for it
    pub fn is_orphaned(&self) -> bool {
        self.status == IntentStatus::PendingRemote && self.gateway_order_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, value: &str, quantity: u32) -> LineItem {
        LineItem {
            name: name.to_string(),
            unit_amount: Amount::new("USD", value).unwrap(),
            quantity,
            description: String::new(),
        }
    }

    fn sample_order(status: OrderStatus) -> Order {
        NewOrder {
            gateway_order_id: "PAY-1".into(),
            intent: Intent::Capture,
            purchase_units: vec![PurchaseUnit {
                reference_id: "default".into(),
                amount: Amount::new("USD", "20.00").unwrap(),
                items: vec![item("Widget", "10.00", 2)],
            }],
            application_context: ApplicationContext {
                return_url: None,
                cancel_url: None,
                brand_name: "My Store".into(),
                landing_page: None,
                user_action: None,
                shipping_preference: None,
            },
            status,
        }
        .into_order(1, Utc::now())
    }

    #[test]
    fn test_status_forward_only() {
        use OrderStatus::*;
        assert!(Created.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Completed));
        assert!(Created.can_transition_to(Cancelled));
        assert!(Completed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Created));
        assert!(!Approved.can_transition_to(Created));
        assert!(!Cancelled.can_transition_to(Approved));
        assert!(!Completed.can_transition_to(Cancelled));
    }

    #[test]
    fn test_apply_rejects_regression() {
        let mut order = sample_order(OrderStatus::Completed);
        let err = order
            .apply(&OrderUpdate::status(OrderStatus::Created))
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidTransition { .. }));
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[test]
    fn test_apply_overrides_metadata() {
        let mut order = sample_order(OrderStatus::Created);
        let update = OrderUpdate {
            intent: Some(Intent::Authorize),
            ..OrderUpdate::default()
        };
        order.apply(&update).unwrap();
        assert_eq!(order.intent, Intent::Authorize);
        assert_eq!(order.gateway_order_id, "PAY-1");
    }

    #[test]
    fn test_normalize_is_fixed_point() {
        let unit = PurchaseUnit {
            reference_id: String::new(),
            amount: Amount::new("USD", "5.00").unwrap(),
            items: vec![LineItem {
                name: "x".repeat(300),
                unit_amount: Amount::new("USD", "5.00").unwrap(),
                quantity: 1,
                description: "d".repeat(140),
            }],
        };

        let once = unit.normalize(0, 1_700_000_000_000);
        assert_eq!(once.reference_id, "ref_0_1700000000000");
        assert_eq!(once.items[0].name.chars().count(), 127);
        assert_eq!(once.items[0].description.chars().count(), 127);

        let twice = once.clone().normalize(3, 42);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_items_total() {
        let unit = PurchaseUnit {
            reference_id: "a".into(),
            amount: Amount::new("USD", "25.50").unwrap(),
            items: vec![item("A", "10.00", 2), item("B", "5.50", 1)],
        };
        assert_eq!(unit.items_total(), Some(Decimal::new(2550, 2)));
    }

    #[test]
    fn test_items_total_overflow() {
        let max = Decimal::MAX.to_string();
        let doubled = PurchaseUnit {
            reference_id: "a".into(),
            amount: Amount::new("USD", "1.00").unwrap(),
            items: vec![item("A", &max, 2)],
        };
        assert_eq!(doubled.items[0].total(), None);
        assert_eq!(doubled.items_total(), None);

        let summed = PurchaseUnit {
            items: vec![item("A", &max, 1), item("B", &max, 1)],
            ..doubled
        };
        assert_eq!(summed.items_total(), None);
    }

    #[test]
    fn test_intent_parsing() {
        assert_eq!("capture".parse::<Intent>().unwrap(), Intent::Capture);
        assert_eq!("AUTHORIZE".parse::<Intent>().unwrap(), Intent::Authorize);
        assert!("SELL".parse::<Intent>().is_err());
    }
}
