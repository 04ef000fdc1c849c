//! # Transaction Types
//!
//! A transaction is the immutable, point-in-time record of money the gateway
//! actually captured. It is written once and never updated.

use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal transaction identifier
pub type TransactionId = i64;

/// Order and capture statuses as reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayStatus {
    Created,
    Saved,
    Approved,
    Voided,
    Completed,
    PayerActionRequired,
    Pending,
    Declined,
    PartiallyRefunded,
    Refunded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl GatewayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayStatus::Created => "CREATED",
            GatewayStatus::Saved => "SAVED",
            GatewayStatus::Approved => "APPROVED",
            GatewayStatus::Voided => "VOIDED",
            GatewayStatus::Completed => "COMPLETED",
            GatewayStatus::PayerActionRequired => "PAYER_ACTION_REQUIRED",
            GatewayStatus::Pending => "PENDING",
            GatewayStatus::Declined => "DECLINED",
            GatewayStatus::PartiallyRefunded => "PARTIALLY_REFUNDED",
            GatewayStatus::Refunded => "REFUNDED",
            GatewayStatus::Failed => "FAILED",
            GatewayStatus::Unknown => "UNKNOWN",
        }
    }

    /// Parse a stored or wire status; unrecognized values map to `Unknown`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATED" => GatewayStatus::Created,
            "SAVED" => GatewayStatus::Saved,
            "APPROVED" => GatewayStatus::Approved,
            "VOIDED" => GatewayStatus::Voided,
            "COMPLETED" => GatewayStatus::Completed,
            "PAYER_ACTION_REQUIRED" => GatewayStatus::PayerActionRequired,
            "PENDING" => GatewayStatus::Pending,
            "DECLINED" => GatewayStatus::Declined,
            "PARTIALLY_REFUNDED" => GatewayStatus::PartiallyRefunded,
            "REFUNDED" => GatewayStatus::Refunded,
            "FAILED" => GatewayStatus::Failed,
            _ => GatewayStatus::Unknown,
        }
    }
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who paid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Payer {
    pub email: String,
    pub given_name: String,
    pub surname: String,
}

/// A single capture inside a purchase unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Gateway capture id
    pub id: String,
    pub status: GatewayStatus,
    pub amount: Amount,
}

/// Snapshot of one captured purchase unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedUnit {
    pub reference_id: String,
    #[serde(default)]
    pub captures: Vec<CaptureRecord>,
}

/// Persisted capture record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,

    /// The gateway order this capture belongs to
    pub gateway_order_id: String,

    pub payer: Payer,

    pub purchase_units: Vec<CapturedUnit>,

    pub status: GatewayStatus,

    pub created_at: DateTime<Utc>,
}

/// Transaction data written by the repository's `create`
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub gateway_order_id: String,
    pub payer: Payer,
    pub purchase_units: Vec<CapturedUnit>,
    pub status: GatewayStatus,
}

impl NewTransaction {
    pub fn into_transaction(self, id: TransactionId, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id,
            gateway_order_id: self.gateway_order_id,
            payer: self.payer,
            purchase_units: self.purchase_units,
            status: self.status,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_status_wire_names() {
        let status: GatewayStatus = serde_json::from_str("\"PAYER_ACTION_REQUIRED\"").unwrap();
        assert_eq!(status, GatewayStatus::PayerActionRequired);

        let unknown: GatewayStatus = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(unknown, GatewayStatus::Unknown);

        assert_eq!(GatewayStatus::parse("completed"), GatewayStatus::Completed);
        assert_eq!(GatewayStatus::Completed.to_string(), "COMPLETED");
    }
}
