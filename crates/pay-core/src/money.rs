//! # Money Types
//!
//! Currency amounts as the gateway models them: an ISO 4217 code and a
//! decimal value carried as a string. Arithmetic goes through
//! `rust_decimal::Decimal` so values never round-trip through floating point.

use crate::error::{PaymentError, PaymentResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Currency used when a request omits one
pub const DEFAULT_CURRENCY: &str = "USD";

/// Maximum length of item names and descriptions accepted by the gateway
pub const MAX_TEXT_LEN: usize = 127;

/// A currency amount (`{ currency_code, value }`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// ISO 4217 code, upper-case
    pub currency_code: String,
    /// Non-negative decimal, full precision
    pub value: String,
}

impl Amount {
    /// Create a validated amount
    pub fn new(currency_code: impl AsRef<str>, value: impl AsRef<str>) -> PaymentResult<Self> {
        let currency_code = normalize_currency(currency_code.as_ref())?;
        let value = value.as_ref().trim();
        parse_non_negative(value)?;
        Ok(Self {
            currency_code,
            value: value.to_string(),
        })
    }

    /// Create an amount from an already computed decimal
    pub fn from_decimal(currency_code: impl Into<String>, value: Decimal) -> Self {
        Self {
            currency_code: currency_code.into(),
            value: value.to_string(),
        }
    }

    /// Parse the value, `None` if it is not a decimal.
    /// Stored history may hold malformed values.
    pub fn decimal(&self) -> Option<Decimal> {
        Decimal::from_str(self.value.trim()).ok()
    }
}

/// Validate and upper-case an ISO 4217 code
pub fn normalize_currency(code: &str) -> PaymentResult<String> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PaymentError::Validation(format!(
            "currency_code must be a 3-letter ISO 4217 code, got {:?}",
            code
        )));
    }
    Ok(code.to_ascii_uppercase())
}

/// Parse a decimal string that must not be negative
pub fn parse_non_negative(value: &str) -> PaymentResult<Decimal> {
    let parsed = Decimal::from_str(value.trim()).map_err(|_| {
        PaymentError::Validation(format!("amount value is not a decimal: {:?}", value))
    })?;
    if parsed < Decimal::ZERO {
        return Err(PaymentError::Validation(format!(
            "amount value must be non-negative, got {}",
            value
        )));
    }
    Ok(parsed)
}

/// Truncate to at most `MAX_TEXT_LEN` characters (not bytes)
pub fn truncate_text(text: &str) -> String {
    match text.char_indices().nth(MAX_TEXT_LEN) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
