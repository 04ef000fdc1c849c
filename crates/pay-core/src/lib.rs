//! # pay-core
//!
//! Core types and workflows for the order-reconciler payment service.
//!
//! This crate provides:
//! - `Amount`, `Order`, `PurchaseUnit` and `Transaction` records
//! - `CreateOrderRequest` / `UpdateOrderRequest` and their one-shot validation
//! - `PaymentGateway` trait implemented by gateway clients
//! - `OrderStore` repository traits with in-memory and SQLite stores
//! - `ReconciliationEngine` for the create/capture workflows
//! - `RevenueAggregator` for owner statistics
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{MemoryStore, LoggingNotifier, OrderDefaults, ReconciliationEngine};
//! use std::sync::Arc;
//!
//! let engine = ReconciliationEngine::new(
//!     Arc::new(gateway),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(LoggingNotifier),
//!     OrderDefaults::default().with_client_origin("https://shop.example"),
//! );
//!
//! // Create the remote order and send the payer to the approval link
//! let created = engine.create_order(request).await?;
//!
//! // After approval, capture with the token the gateway redirected back with
//! let transaction = engine.capture_order(&token).await?;
//! ```

pub mod engine;
pub mod error;
pub mod gateway;
pub mod money;
pub mod notify;
pub mod order;
pub mod request;
pub mod revenue;
pub mod store;
pub mod transaction;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use engine::ReconciliationEngine;
pub use error::{PaymentError, PaymentResult, GENERIC_GATEWAY_MESSAGE};
pub use gateway::{AccessToken, PaymentGateway, RemoteCapture, RemoteOrder, SharedGateway};
pub use money::{Amount, DEFAULT_CURRENCY, MAX_TEXT_LEN};
pub use notify::{LoggingNotifier, NotificationSink, SharedNotifier};
pub use order::{
    ApplicationContext, CreatedOrder, Intent, IntentStatus, LineItem, NewOrder, Order,
    OrderId, OrderIntent, OrderStatus, OrderUpdate, OwnerId, PurchaseUnit,
};
pub use request::{
    ApplicationContextInput, CreateOrderRequest, OrderDefaults, OrderDraft, PurchaseUnitInput,
    UpdateOrderRequest,
};
pub use revenue::{MonthlyRevenue, OrderStats, RevenueAggregator};
pub use store::{
    CaptureClaims, IntentJournal, MemoryStore, OrderFilter, OrderRepository, OrderStore,
    SharedStore, SqliteStore, TransactionFilter, TransactionRepository,
};
pub use transaction::{
    CaptureRecord, CapturedUnit, GatewayStatus, NewTransaction, Payer, Transaction,
    TransactionId,
};
