//! # Payment Gateway Trait
//!
//! The seam between the reconciliation engine and the remote payment gateway.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PaymentGateway (trait)                     │
//! │  ├── authenticate()                                         │
//! │  ├── create_remote_order()                                  │
//! │  └── capture_remote_order()                                 │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                  ┌─────────┴─────────┐
//!          ┌───────┴───────┐   ┌───────┴───────┐
//!          │ PayPalClient  │   │  test doubles │
//!          └───────────────┘   └───────────────┘
//! ```

use crate::error::PaymentResult;
use crate::order::{ApplicationContext, Intent, PurchaseUnit};
use crate::transaction::{CapturedUnit, GatewayStatus, NewTransaction, Payer};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;

/// Short-lived bearer credential issued by the gateway
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// The raw bearer value
    pub fn secret(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once `now` is within `margin` of expiry
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        now + margin >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What the gateway returns for a newly created order
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteOrder {
    pub gateway_order_id: String,
    pub status: GatewayStatus,
    /// Link with relation `approve`, if the gateway sent one
    pub approval_link: Option<String>,
}

/// What the gateway returns for a capture
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCapture {
    pub gateway_order_id: String,
    pub status: GatewayStatus,
    pub payer: Payer,
    pub purchase_units: Vec<CapturedUnit>,
}

impl RemoteCapture {
    /// Snapshot of the capture as a transaction record
    pub fn to_new_transaction(&self) -> NewTransaction {
        NewTransaction {
            gateway_order_id: self.gateway_order_id.clone(),
            payer: self.payer.clone(),
            purchase_units: self.purchase_units.clone(),
            status: self.status,
        }
    }
}

/// Remote payment gateway operations.
///
/// Implementations translate the normalized order shape into the gateway's
/// wire format and map failures into `GatewayAuth` / `GatewayRequest`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Exchange client credentials for a bearer token
    async fn authenticate(&self) -> PaymentResult<AccessToken>;

    /// Create an order on the gateway
    async fn create_remote_order(
        &self,
        token: &AccessToken,
        intent: Intent,
        purchase_units: &[PurchaseUnit],
        application_context: &ApplicationContext,
    ) -> PaymentResult<RemoteOrder>;

    /// Capture a previously approved order
    async fn capture_remote_order(&self, gateway_order_id: &str) -> PaymentResult<RemoteCapture>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type SharedGateway = Arc<dyn PaymentGateway>;
