//! # PayPal Wire Types
//!
//! Request and response bodies of the Orders v2 API. Only the fields this
//! service reads are modeled; everything else is ignored.

use pay_core::{
    Amount, ApplicationContext, CaptureRecord, CapturedUnit, GatewayStatus, Intent, LineItem,
    Payer, PurchaseUnit, RemoteCapture, RemoteOrder,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct CreateOrderBody<'a> {
    pub intent: &'static str,
    pub purchase_units: Vec<WirePurchaseUnit<'a>>,
    pub application_context: &'a ApplicationContext,
}

impl<'a> CreateOrderBody<'a> {
    pub fn new(
        intent: Intent,
        purchase_units: &'a [PurchaseUnit],
        application_context: &'a ApplicationContext,
    ) -> Self {
        Self {
            intent: intent.as_str(),
            purchase_units: purchase_units.iter().map(WirePurchaseUnit::from).collect(),
            application_context,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WirePurchaseUnit<'a> {
    pub reference_id: &'a str,
    pub amount: WireAmount<'a>,
    pub items: Vec<WireItem<'a>>,
}

/// Unit amount with its `item_total` breakdown
#[derive(Debug, Serialize)]
pub(crate) struct WireAmount<'a> {
    pub currency_code: &'a str,
    pub value: &'a str,
    pub breakdown: WireBreakdown<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireBreakdown<'a> {
    pub item_total: &'a Amount,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireItem<'a> {
    pub name: &'a str,
    pub unit_amount: &'a Amount,
    /// PayPal expects the quantity as a string
    pub quantity: String,
    pub description: &'a str,
}

impl<'a> From<&'a PurchaseUnit> for WirePurchaseUnit<'a> {
    fn from(unit: &'a PurchaseUnit) -> Self {
        Self {
            reference_id: &unit.reference_id,
            amount: WireAmount {
                currency_code: &unit.amount.currency_code,
                value: &unit.amount.value,
                breakdown: WireBreakdown {
                    item_total: &unit.amount,
                },
            },
            items: unit.items.iter().map(WireItem::from).collect(),
        }
    }
}

impl<'a> From<&'a LineItem> for WireItem<'a> {
    fn from(item: &'a LineItem) -> Self {
        Self {
            name: &item.name,
            unit_amount: &item.unit_amount,
            quantity: item.quantity.to_string(),
            description: &item.description,
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct OrderResponse {
    pub id: String,
    pub status: GatewayStatus,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Link {
    pub href: String,
    pub rel: String,
}

impl From<OrderResponse> for RemoteOrder {
    fn from(response: OrderResponse) -> Self {
        let approval_link = response
            .links
            .into_iter()
            .find(|link| link.rel == "approve")
            .map(|link| link.href);

        RemoteOrder {
            gateway_order_id: response.id,
            status: response.status,
            approval_link,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CaptureResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub status: GatewayStatus,
    #[serde(default)]
    pub purchase_units: Vec<CaptureUnit>,
    #[serde(default)]
    pub payer: Option<WirePayer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CaptureUnit {
    #[serde(default)]
    pub reference_id: String,
    #[serde(default)]
    pub payments: Option<Payments>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Payments {
    #[serde(default)]
    pub captures: Vec<CaptureRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePayer {
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub name: Option<PayerName>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PayerName {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub surname: String,
}

impl CaptureResponse {
    /// `requested_id` fills in when the response omits the order id
    pub fn into_remote(self, requested_id: &str) -> RemoteCapture {
        let payer = self
            .payer
            .map(|payer| {
                let name = payer.name.unwrap_or_default();
                Payer {
                    email: payer.email_address,
                    given_name: name.given_name,
                    surname: name.surname,
                }
            })
            .unwrap_or_default();

        RemoteCapture {
            gateway_order_id: self.id.unwrap_or_else(|| requested_id.to_string()),
            status: self.status,
            payer,
            purchase_units: self
                .purchase_units
                .into_iter()
                .map(|unit| CapturedUnit {
                    reference_id: unit.reference_id,
                    captures: unit.payments.map(|p| p.captures).unwrap_or_default(),
                })
                .collect(),
        }
    }
}

/// Error body; REST errors carry `message`, OAuth errors `error_description`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ErrorBody {
    /// Best available message from a raw body, if any
    pub fn message_from(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        parsed.message.or(parsed.error_description)
    }
}
