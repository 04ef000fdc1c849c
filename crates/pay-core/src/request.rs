//! # Request Validation
//!
//! Loose, caller-facing request shapes and the single validation step that
//! turns them into strongly typed drafts. Nothing downstream of `validate`
//! sees an unchecked field.

use crate::error::{PaymentError, PaymentResult};
use crate::money::{normalize_currency, Amount, DEFAULT_CURRENCY};
use crate::order::{
    ApplicationContext, Intent, LineItem, OrderStatus, OrderUpdate, PurchaseUnit,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// =============================================================================
// Defaults
// =============================================================================

/// Values injected when a create request leaves them out.
/// Loaded from `config/orders.toml` and overridden by the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDefaults {
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_brand_name")]
    pub brand_name: String,

    #[serde(default)]
    pub return_url: Option<String>,

    #[serde(default)]
    pub cancel_url: Option<String>,

    #[serde(default = "default_user_action")]
    pub user_action: Option<String>,

    #[serde(default = "default_shipping_preference")]
    pub shipping_preference: Option<String>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_brand_name() -> String {
    "My Store".to_string()
}

fn default_user_action() -> Option<String> {
    Some("PAY_NOW".to_string())
}

fn default_shipping_preference() -> Option<String> {
    Some("NO_SHIPPING".to_string())
}

impl Default for OrderDefaults {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            brand_name: default_brand_name(),
            return_url: None,
            cancel_url: None,
            user_action: default_user_action(),
            shipping_preference: default_shipping_preference(),
        }
    }
}

impl OrderDefaults {
    /// Load defaults from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Builder: derive return/cancel URLs from the client origin
    pub fn with_client_origin(mut self, origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        self.return_url = Some(format!("{}/order/success", origin));
        self.cancel_url = Some(format!("{}/order/cancel", origin));
        self
    }

    /// Builder: set brand name
    pub fn with_brand_name(mut self, brand_name: impl Into<String>) -> Self {
        self.brand_name = brand_name.into();
        self
    }

    /// The context used when a request supplies none
    pub fn application_context(&self) -> ApplicationContext {
        ApplicationContext {
            return_url: self.return_url.clone(),
            cancel_url: self.cancel_url.clone(),
            brand_name: self.brand_name.clone(),
            landing_page: None,
            user_action: self.user_action.clone(),
            shipping_preference: self.shipping_preference.clone(),
        }
    }
}

// =============================================================================
// Raw request shapes
// =============================================================================

/// Body of a create-order request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub intent: Option<String>,

    #[serde(default)]
    pub purchase_units: Vec<PurchaseUnitInput>,

    #[serde(default)]
    pub application_context: Option<ApplicationContextInput>,
}

/// Body of an update-order request; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub intent: Option<String>,

    #[serde(default)]
    pub purchase_units: Option<Vec<PurchaseUnitInput>>,

    #[serde(default)]
    pub application_context: Option<ApplicationContextInput>,

    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseUnitInput {
    #[serde(default)]
    pub reference_id: Option<String>,

    #[serde(default)]
    pub amount: Option<AmountInput>,

    #[serde(default)]
    pub items: Vec<LineItemInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmountInput {
    #[serde(default)]
    pub currency_code: Option<String>,

    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemInput {
    pub name: String,

    pub unit_amount: AmountInput,

    #[serde(default)]
    pub quantity: Option<QuantityInput>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Quantities arrive as numbers or numeric strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Count(u64),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationContextInput {
    #[serde(default)]
    pub return_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub landing_page: Option<String>,
    #[serde(default)]
    pub user_action: Option<String>,
    #[serde(default)]
    pub shipping_preference: Option<String>,
}

// =============================================================================
// Validated shapes
// =============================================================================

/// A create request that passed validation and normalization
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub intent: Intent,
    pub purchase_units: Vec<PurchaseUnit>,
    pub application_context: ApplicationContext,
}

impl CreateOrderRequest {
    /// Validate and normalize. `stamp_millis` seeds synthesized reference ids.
    pub fn validate(self, defaults: &OrderDefaults, stamp_millis: i64) -> PaymentResult<OrderDraft> {
        let intent = match self.intent {
            Some(raw) => raw.parse()?,
            None => Intent::default(),
        };

        let purchase_units = validate_units(self.purchase_units, defaults, stamp_millis)?;

        let application_context = match self.application_context {
            Some(input) => input.validate(defaults)?,
            None => defaults.application_context(),
        };

        Ok(OrderDraft {
            intent,
            purchase_units,
            application_context,
        })
    }
}

impl UpdateOrderRequest {
    /// Validate into an update. Unset fields leave the stored order alone.
    pub fn validate(self, defaults: &OrderDefaults, stamp_millis: i64) -> PaymentResult<OrderUpdate> {
        let intent = self.intent.map(|raw| raw.parse::<Intent>()).transpose()?;
        let status = self
            .status
            .map(|raw| raw.parse::<OrderStatus>())
            .transpose()?;
        let purchase_units = self
            .purchase_units
            .map(|units| validate_units(units, defaults, stamp_millis))
            .transpose()?;
        let application_context = self
            .application_context
            .map(|input| input.validate(defaults))
            .transpose()?;

        Ok(OrderUpdate {
            intent,
            purchase_units,
            application_context,
            status,
            captured_at: None,
        })
    }
}

impl ApplicationContextInput {
    fn validate(self, defaults: &OrderDefaults) -> PaymentResult<ApplicationContext> {
        let brand_name = match self.brand_name {
            Some(name) if name.trim().is_empty() => {
                return Err(PaymentError::Validation(
                    "application_context.brand_name must not be empty".to_string(),
                ))
            }
            Some(name) => name,
            None => defaults.brand_name.clone(),
        };

        Ok(ApplicationContext {
            return_url: self.return_url,
            cancel_url: self.cancel_url,
            brand_name,
            landing_page: self.landing_page,
            user_action: self.user_action,
            shipping_preference: self.shipping_preference,
        })
    }
}

fn validate_units(
    inputs: Vec<PurchaseUnitInput>,
    defaults: &OrderDefaults,
    stamp_millis: i64,
) -> PaymentResult<Vec<PurchaseUnit>> {
    if inputs.is_empty() {
        return Err(PaymentError::Validation(
            "purchase_units must contain at least one unit".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut units = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.into_iter().enumerate() {
        let unit = input.validate(index, defaults)?.normalize(index, stamp_millis);
        if !seen.insert(unit.reference_id.clone()) {
            return Err(PaymentError::Validation(format!(
                "duplicate reference_id {:?}",
                unit.reference_id
            )));
        }
        units.push(unit);
    }

    Ok(units)
}

impl PurchaseUnitInput {
    fn validate(self, index: usize, defaults: &OrderDefaults) -> PaymentResult<PurchaseUnit> {
        let unit_currency = match self
            .amount
            .as_ref()
            .and_then(|a| a.currency_code.as_deref())
        {
            Some(code) => normalize_currency(code)?,
            None => normalize_currency(&defaults.currency)?,
        };

        let items = self
            .items
            .into_iter()
            .map(|item| item.validate(&unit_currency))
            .collect::<PaymentResult<Vec<_>>>()?;

        let mut unit = PurchaseUnit {
            reference_id: self.reference_id.unwrap_or_default().trim().to_string(),
            amount: Amount::from_decimal(unit_currency.clone(), Default::default()),
            items,
        };

        let items_total = if unit.items.is_empty() {
            None
        } else {
            Some(unit.items_total().ok_or_else(|| {
                PaymentError::Validation(format!("purchase unit {} total overflows", index))
            })?)
        };

        unit.amount = match (self.amount, items_total) {
            (Some(amount), None) => Amount::new(&unit_currency, &amount.value)?,
            (Some(amount), Some(total)) => {
                let amount = Amount::new(&unit_currency, &amount.value)?;
                // Sent as breakdown.item_total, which must match the items
                if amount.decimal() != Some(total) {
                    return Err(PaymentError::Validation(format!(
                        "purchase unit {} amount {} does not match its items total {}",
                        index, amount.value, total
                    )));
                }
                amount
            }
            (None, Some(total)) => Amount::from_decimal(unit_currency, total),
            (None, None) => {
                return Err(PaymentError::Validation(format!(
                    "purchase unit {} needs an amount or at least one item",
                    index
                )))
            }
        };

        Ok(unit)
    }
}

impl LineItemInput {
    fn validate(self, unit_currency: &str) -> PaymentResult<LineItem> {
        if self.name.trim().is_empty() {
            return Err(PaymentError::Validation(
                "item name must not be empty".to_string(),
            ));
        }

        let currency = match self.unit_amount.currency_code.as_deref() {
            Some(code) => normalize_currency(code)?,
            None => unit_currency.to_string(),
        };
        if currency != unit_currency {
            return Err(PaymentError::Validation(format!(
                "item {:?} is priced in {} but its unit uses {}",
                self.name, currency, unit_currency
            )));
        }

        let quantity = match self.quantity {
            None => 1,
            Some(QuantityInput::Count(n)) => positive_quantity(n)?,
            Some(QuantityInput::Text(text)) => {
                let n = text.trim().parse::<u64>().map_err(|_| {
                    PaymentError::Validation(format!("quantity is not an integer: {:?}", text))
                })?;
                positive_quantity(n)?
            }
        };

        Ok(LineItem {
            name: self.name,
            unit_amount: Amount::new(&currency, &self.unit_amount.value)?,
            quantity,
            description: self.description.unwrap_or_default(),
        })
    }
}

fn positive_quantity(n: u64) -> PaymentResult<u32> {
    if n == 0 {
        return Err(PaymentError::Validation(
            "quantity must be positive".to_string(),
        ));
    }
    u32::try_from(n)
        .map_err(|_| PaymentError::Validation(format!("quantity too large: {}", n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> CreateOrderRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_widget_request_defaults() {
        let request = parse(json!({
            "purchase_units": [{
                "items": [{ "name": "Widget", "unit_amount": { "value": "10.00" }, "quantity": 2 }]
            }]
        }));

        let draft = request.validate(&OrderDefaults::default(), 1234).unwrap();
        assert_eq!(draft.intent, Intent::Capture);

        let unit = &draft.purchase_units[0];
        assert_eq!(unit.reference_id, "ref_0_1234");
        assert_eq!(unit.amount, Amount::new("USD", "20.00").unwrap());
        assert_eq!(unit.items[0].quantity, 2);
        assert_eq!(unit.items[0].unit_amount.currency_code, "USD");
        assert_eq!(unit.items[0].description, "");

        assert_eq!(draft.application_context.brand_name, "My Store");
        assert_eq!(
            draft.application_context.user_action.as_deref(),
            Some("PAY_NOW")
        );
    }

    #[test]
    fn test_string_quantity_and_explicit_amount() {
        let request = parse(json!({
            "intent": "AUTHORIZE",
            "purchase_units": [{
                "reference_id": "cart-7",
                "amount": { "currency_code": "eur", "value": "3.00" },
                "items": [{ "name": "Pen", "unit_amount": { "value": "1.50" }, "quantity": "2" }]
            }],
            "application_context": { "brand_name": "Shop" }
        }));

        let draft = request.validate(&OrderDefaults::default(), 0).unwrap();
        assert_eq!(draft.intent, Intent::Authorize);
        assert_eq!(draft.purchase_units[0].reference_id, "cart-7");
        assert_eq!(draft.purchase_units[0].amount.currency_code, "EUR");
        assert_eq!(draft.purchase_units[0].items[0].unit_amount.currency_code, "EUR");
        assert_eq!(draft.application_context.brand_name, "Shop");
    }

    #[test]
    fn test_total_overflow_is_validation_error() {
        let request = parse(json!({
            "purchase_units": [{
                "items": [{
                    "name": "Yacht",
                    "unit_amount": { "value": "79228162514264337593543950335" },
                    "quantity": 2
                }]
            }]
        }));

        match request.validate(&OrderDefaults::default(), 0) {
            Err(PaymentError::Validation(message)) => assert!(message.contains("overflows")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_amount_must_match_items_total() {
        let mismatch = parse(json!({
            "purchase_units": [{
                "amount": { "value": "25.00" },
                "items": [{ "name": "Widget", "unit_amount": { "value": "10.00" }, "quantity": 2 }]
            }]
        }));
        assert!(matches!(
            mismatch.validate(&OrderDefaults::default(), 0),
            Err(PaymentError::Validation(_))
        ));

        let same_value_other_scale = parse(json!({
            "purchase_units": [{
                "amount": { "value": "20" },
                "items": [{ "name": "Widget", "unit_amount": { "value": "10.00" }, "quantity": 2 }]
            }]
        }));
        let draft = same_value_other_scale
            .validate(&OrderDefaults::default(), 0)
            .unwrap();
        assert_eq!(draft.purchase_units[0].amount.value, "20");
    }

    #[test]
    fn test_rejects_malformed_shapes() {
        let defaults = OrderDefaults::default();

        let empty = parse(json!({ "purchase_units": [] }));
        assert!(matches!(
            empty.validate(&defaults, 0),
            Err(PaymentError::Validation(_))
        ));

        let bad_intent = parse(json!({
            "intent": "SELL",
            "purchase_units": [{ "amount": { "value": "1.00" } }]
        }));
        assert!(bad_intent.validate(&defaults, 0).is_err());

        let zero_quantity = parse(json!({
            "purchase_units": [{
                "items": [{ "name": "W", "unit_amount": { "value": "1.00" }, "quantity": 0 }]
            }]
        }));
        assert!(zero_quantity.validate(&defaults, 0).is_err());

        let negative = parse(json!({
            "purchase_units": [{ "amount": { "value": "-5" } }]
        }));
        assert!(negative.validate(&defaults, 0).is_err());

        let nothing = parse(json!({ "purchase_units": [{}] }));
        assert!(nothing.validate(&defaults, 0).is_err());

        let duplicate = parse(json!({
            "purchase_units": [
                { "reference_id": "a", "amount": { "value": "1" } },
                { "reference_id": "a", "amount": { "value": "2" } }
            ]
        }));
        assert!(duplicate.validate(&defaults, 0).is_err());

        let empty_brand = parse(json!({
            "purchase_units": [{ "amount": { "value": "1" } }],
            "application_context": { "brand_name": "" }
        }));
        assert!(empty_brand.validate(&defaults, 0).is_err());
    }

    #[test]
    fn test_update_request() {
        let update: UpdateOrderRequest = serde_json::from_value(json!({
            "intent": "AUTHORIZE",
            "status": "cancelled"
        }))
        .unwrap();

        let update = update.validate(&OrderDefaults::default(), 0).unwrap();
        assert_eq!(update.intent, Some(Intent::Authorize));
        assert_eq!(update.status, Some(OrderStatus::Cancelled));
        assert!(update.purchase_units.is_none());
    }

    #[test]
    fn test_defaults_from_toml() {
        let defaults = OrderDefaults::from_toml(
            r#"
            currency = "EUR"
            brand_name = "Test Shop"
            "#,
        )
        .unwrap()
        .with_client_origin("https://shop.example/");

        assert_eq!(defaults.currency, "EUR");
        assert_eq!(defaults.shipping_preference.as_deref(), Some("NO_SHIPPING"));
        assert_eq!(
            defaults.return_url.as_deref(),
            Some("https://shop.example/order/success")
        );
    }
}
