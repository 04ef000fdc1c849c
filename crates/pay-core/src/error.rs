//! # Payment Error Types
//!
//! Typed error handling for the order reconciliation core.
//! All operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Message used when the gateway rejects a request without saying why
pub const GENERIC_GATEWAY_MESSAGE: &str = "PayPal API Error";

/// Core error type for all order and payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed request shape, rejected before any I/O
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Credential exchange with the gateway failed
    #[error("Gateway authentication failed: {0}")]
    GatewayAuth(String),

    /// The gateway rejected an order request
    #[error("Gateway request failed [{status_code}]: {message}")]
    GatewayRequest { status_code: u16, message: String },

    /// Local order lookup miss
    #[error("Order not found: {id}")]
    OrderNotFound { id: String },

    /// Local transaction lookup miss
    #[error("Transaction not found: {id}")]
    TransactionNotFound { id: String },

    /// A capture for this gateway order is already claimed locally
    #[error("Capture already in progress or completed for order {gateway_order_id}")]
    CaptureInProgress { gateway_order_id: String },

    /// Order status may only move forward
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Local persistence failed
    #[error("Store write failed: {0}")]
    StoreWrite(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (store reads, broken invariants)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    /// Build a gateway request error, falling back to the generic message
    pub fn gateway_request(status_code: u16, message: Option<String>) -> Self {
        PaymentError::GatewayRequest {
            status_code,
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_GATEWAY_MESSAGE.to_string()),
        }
    }

    /// Returns true if this error is retryable by the caller.
    ///
    /// Nothing inside the core retries; this only informs callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::GatewayAuth(_) => true,
            PaymentError::GatewayRequest { status_code, .. } => {
                *status_code == 429 || *status_code >= 500
            }
            _ => false,
        }
    }

    /// True when a failed gateway call may still have taken effect remotely:
    /// a server-side or transport failure, or a success body we could not read.
    pub fn remote_outcome_unknown(&self) -> bool {
        match self {
            PaymentError::GatewayRequest { status_code, .. } => *status_code >= 500,
            PaymentError::Serialization(_) => true,
            _ => false,
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::Validation(_) => 400,
            PaymentError::GatewayAuth(_) => 502,
            PaymentError::GatewayRequest { status_code, .. } => {
                if (400..=599).contains(status_code) {
                    *status_code
                } else {
                    500
                }
            }
            PaymentError::OrderNotFound { .. } => 404,
            PaymentError::TransactionNotFound { .. } => 404,
            PaymentError::CaptureInProgress { .. } => 409,
            PaymentError::InvalidTransition { .. } => 409,
            PaymentError::StoreWrite(_) => 500,
            PaymentError::Serialization(_) => 500,
            PaymentError::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Serialization(err.to_string())
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PaymentError::GatewayAuth("timeout".into()).is_retryable());
        assert!(PaymentError::gateway_request(503, None).is_retryable());
        assert!(!PaymentError::gateway_request(422, None).is_retryable());
        assert!(!PaymentError::Validation("bad data".into()).is_retryable());
    }

    #[test]
    fn test_remote_outcome_unknown() {
        assert!(PaymentError::gateway_request(500, None).remote_outcome_unknown());
        assert!(PaymentError::gateway_request(504, None).remote_outcome_unknown());
        assert!(PaymentError::Serialization("eof".into()).remote_outcome_unknown());
        assert!(!PaymentError::gateway_request(422, None).remote_outcome_unknown());
        assert!(!PaymentError::gateway_request(429, None).remote_outcome_unknown());
        assert!(!PaymentError::GatewayAuth("denied".into()).remote_outcome_unknown());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(PaymentError::Validation("test".into()).status_code(), 400);
        assert_eq!(
            PaymentError::OrderNotFound { id: "7".into() }.status_code(),
            404
        );
        assert_eq!(
            PaymentError::gateway_request(422, Some("ORDER_ALREADY_CAPTURED".into()))
                .status_code(),
            422
        );
        assert_eq!(PaymentError::gateway_request(0, None).status_code(), 500);
        assert_eq!(PaymentError::StoreWrite("disk".into()).status_code(), 500);
    }

    #[test]
    fn test_gateway_message_fallback() {
        match PaymentError::gateway_request(500, Some("  ".into())) {
            PaymentError::GatewayRequest { message, .. } => {
                assert_eq!(message, GENERIC_GATEWAY_MESSAGE)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
