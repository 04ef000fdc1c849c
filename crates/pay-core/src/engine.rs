//! # Order Reconciliation Engine
//!
//! Orchestrates the create-order and capture-order workflows and keeps the
//! local records consistent with the gateway.
//!
//! ```text
//! create:  validate ─► journal PENDING_REMOTE ─► authenticate ─► create remote
//!                                                     │ rejected     │ ok
//!                                                     ▼              ▼
//!                                              journal FAILED   write Order ─► journal CREATED
//!
//! A 5xx, transport or unreadable create response leaves the attempt PENDING_REMOTE.
//!
//! capture: claim ─► capture remote ─► write Transaction ─► advance Order ─► notify (detached)
//!                        │ fail
//!                        ▼
//!                  release claim
//! ```

use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{RemoteOrder, SharedGateway};
use crate::notify::SharedNotifier;
use crate::order::{
    CreatedOrder, NewOrder, Order, OrderId, OrderIntent, OrderStatus, OrderUpdate, OwnerId,
};
use crate::request::{CreateOrderRequest, OrderDefaults, OrderDraft, UpdateOrderRequest};
use crate::store::{
    CaptureClaims, IntentJournal, OrderFilter, OrderRepository, SharedStore, TransactionRepository,
};
use crate::transaction::{GatewayStatus, Transaction};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Coordinates the gateway, the store and the notification sink
#[derive(Clone)]
pub struct ReconciliationEngine {
    gateway: SharedGateway,
    store: SharedStore,
    notifier: SharedNotifier,
    defaults: OrderDefaults,
}

impl ReconciliationEngine {
    pub fn new(
        gateway: SharedGateway,
        store: SharedStore,
        notifier: SharedNotifier,
        defaults: OrderDefaults,
    ) -> Self {
        Self {
            gateway,
            store,
            notifier,
            defaults,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn defaults(&self) -> &OrderDefaults {
        &self.defaults
    }

    /// Validate the request, create the order on the gateway, then record it.
    ///
    /// No Order is written unless the gateway confirmed. A local write failure
    /// after remote success is returned as `StoreWrite` and the attempt stays
    /// `PENDING_REMOTE` in the journal. So does an attempt whose gateway call
    /// failed without a definite answer (5xx, transport, unreadable body).
    #[instrument(skip(self, request), fields(provider = self.gateway.provider_name()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> PaymentResult<CreatedOrder> {
        let draft = request.validate(&self.defaults, Utc::now().timestamp_millis())?;
        let attempt = self.store.begin_intent().await?;

        let remote = match self.create_remote(&draft).await {
            Ok(remote) => remote,
            Err(err) if err.remote_outcome_unknown() => {
                // The remote order may exist; keep the attempt PENDING_REMOTE
                error!(intent_id = attempt.id, error = %err, "Order creation outcome unknown");
                return Err(err);
            }
            Err(err) => {
                warn!(intent_id = attempt.id, error = %err, "Gateway rejected order creation");
                if let Err(journal_err) = self.store.fail_intent(attempt.id, &err.to_string()).await
                {
                    error!(intent_id = attempt.id, error = %journal_err, "Failed to mark attempt failed");
                }
                return Err(err);
            }
        };

        if let Err(err) = self
            .store
            .record_remote(attempt.id, &remote.gateway_order_id)
            .await
        {
            error!(
                intent_id = attempt.id,
                gateway_order_id = %remote.gateway_order_id,
                error = %err,
                "Failed to journal remote order id"
            );
        }

        let new_order = NewOrder {
            gateway_order_id: remote.gateway_order_id.clone(),
            intent: draft.intent,
            purchase_units: draft.purchase_units,
            application_context: draft.application_context,
            status: OrderStatus::Created,
        };

        let order = self.store.create_order(new_order).await.map_err(|err| {
            error!(
                intent_id = attempt.id,
                gateway_order_id = %remote.gateway_order_id,
                error = %err,
                "Remote order created but local write failed; left for reconciliation"
            );
            match err {
                write @ PaymentError::StoreWrite(_) => write,
                other => PaymentError::StoreWrite(other.to_string()),
            }
        })?;

        if let Err(err) = self.store.resolve_intent(attempt.id, order.id).await {
            error!(intent_id = attempt.id, order_id = order.id, error = %err, "Failed to resolve attempt");
        }

        info!(
            "Created order: id={}, gateway_order_id={}",
            order.id, order.gateway_order_id
        );

        Ok(CreatedOrder {
            order,
            approval_link: remote.approval_link,
        })
    }

    async fn create_remote(&self, draft: &OrderDraft) -> PaymentResult<RemoteOrder> {
        let token = self.gateway.authenticate().await?;
        self.gateway
            .create_remote_order(
                &token,
                draft.intent,
                &draft.purchase_units,
                &draft.application_context,
            )
            .await
    }

    /// Capture an approved order and record the resulting transaction.
    ///
    /// The gateway order id is claimed locally first; a second capture of the
    /// same id fails with `CaptureInProgress` without reaching the gateway.
    #[instrument(skip(self), fields(provider = self.gateway.provider_name()))]
    pub async fn capture_order(&self, gateway_order_id: &str) -> PaymentResult<Transaction> {
        let gateway_order_id = gateway_order_id.trim();
        if gateway_order_id.is_empty() {
            return Err(PaymentError::Validation("token is required".into()));
        }

        if !self.store.claim_capture(gateway_order_id).await? {
            return Err(PaymentError::CaptureInProgress {
                gateway_order_id: gateway_order_id.to_string(),
            });
        }

        let remote = match self.gateway.capture_remote_order(gateway_order_id).await {
            Ok(remote) => remote,
            Err(err) => {
                warn!(gateway_order_id, error = %err, "Gateway rejected capture");
                if let Err(release_err) = self.store.release_capture(gateway_order_id).await {
                    error!(gateway_order_id, error = %release_err, "Failed to release capture claim");
                }
                return Err(err);
            }
        };

        let transaction = self
            .store
            .create_transaction(remote.to_new_transaction())
            .await
            .map_err(|err| {
                error!(
                    gateway_order_id,
                    error = %err,
                    "Gateway captured funds but the transaction write failed"
                );
                err
            })?;

        info!(
            "Captured order: gateway_order_id={}, transaction_id={}, status={}",
            gateway_order_id, transaction.id, transaction.status
        );

        if remote.status == GatewayStatus::Completed {
            self.complete_local_order(gateway_order_id).await;
        }

        self.notify(&transaction);
        Ok(transaction)
    }

    /// Best effort: advance the matching Order to COMPLETED
    async fn complete_local_order(&self, gateway_order_id: &str) {
        let order = match self.store.find_order_by_gateway_id(gateway_order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(gateway_order_id, "No local order for captured gateway order");
                return;
            }
            Err(err) => {
                error!(gateway_order_id, error = %err, "Failed to look up captured order");
                return;
            }
        };

        let update = OrderUpdate::completed_at(Utc::now());
        match self.store.update_order(order.id, &update).await {
            Ok(_) => debug!(order_id = order.id, "Order marked completed"),
            Err(err) => {
                error!(order_id = order.id, error = %err, "Failed to mark order completed")
            }
        }
    }

    fn notify(&self, transaction: &Transaction) {
        let notifier = Arc::clone(&self.notifier);
        let snapshot = transaction.clone();
        tokio::spawn(async move {
            if let Err(err) = notifier.send_confirmation(&snapshot).await {
                warn!(
                    transaction_id = snapshot.id,
                    error = %err,
                    "Payment confirmation not delivered"
                );
            }
        });
    }

    /// Apply a local metadata edit. Never contacts the gateway.
    #[instrument(skip(self, request))]
    pub async fn update_order(
        &self,
        id: OrderId,
        request: UpdateOrderRequest,
    ) -> PaymentResult<Order> {
        let update = request.validate(&self.defaults, Utc::now().timestamp_millis())?;
        let order = self.store.update_order(id, &update).await?;
        info!("Updated order: id={}", id);
        Ok(order)
    }

    /// Remove the local record. The gateway order is left as is.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> PaymentResult<()> {
        self.store.delete_order(id).await?;
        info!("Deleted order: id={}", id);
        Ok(())
    }

    pub async fn get_order(&self, id: OrderId) -> PaymentResult<Order> {
        self.store
            .find_order(id)
            .await?
            .ok_or_else(|| PaymentError::OrderNotFound { id: id.to_string() })
    }

    pub async fn list_orders(&self) -> PaymentResult<Vec<Order>> {
        self.store.find_orders(&OrderFilter::default()).await
    }

    /// Mark the order the payer abandoned as CANCELLED
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, gateway_order_id: &str) -> PaymentResult<Order> {
        let order = self
            .store
            .find_order_by_gateway_id(gateway_order_id)
            .await?
            .ok_or_else(|| PaymentError::OrderNotFound {
                id: gateway_order_id.to_string(),
            })?;

        let order = self
            .store
            .update_order(order.id, &OrderUpdate::status(OrderStatus::Cancelled))
            .await?;
        info!("Cancelled order: id={}, gateway_order_id={}", order.id, gateway_order_id);
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn link_owner(&self, order_id: OrderId, owner_id: OwnerId) -> PaymentResult<()> {
        self.store.link_owner(order_id, owner_id).await
    }

    /// Create-order attempts whose outcome was never recorded locally
    pub async fn pending_reconciliation(&self) -> PaymentResult<Vec<OrderIntent>> {
        self.store.unresolved_intents().await
    }
}
