//! # Payment Confirmation Notifications
//!
//! After a capture is recorded the engine hands the transaction to a
//! `NotificationSink`. Delivery runs detached from the capture request, so a
//! failing sink never changes the capture result.

use crate::error::PaymentResult;
use crate::transaction::Transaction;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Receiver of payment confirmations
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a confirmation for a recorded transaction
    async fn send_confirmation(&self, transaction: &Transaction) -> PaymentResult<()>;
}

/// Type alias for a shared sink (dynamic dispatch)
pub type SharedNotifier = Arc<dyn NotificationSink>;

/// Sink that only logs; the default when no webhook is configured
pub struct LoggingNotifier;

#[async_trait]
impl NotificationSink for LoggingNotifier {
    async fn send_confirmation(&self, transaction: &Transaction) -> PaymentResult<()> {
        info!(
            transaction_id = transaction.id,
            gateway_order_id = %transaction.gateway_order_id,
            status = %transaction.status,
            payer = %transaction.payer.email,
            "Payment confirmation"
        );
        Ok(())
    }
}
