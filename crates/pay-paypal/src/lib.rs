//! # pay-paypal
//!
//! PayPal gateway client for order-reconciler-rs.
//!
//! Implements `pay_core::PaymentGateway` over the Orders v2 REST API:
//!
//! - `POST /v1/oauth2/token` client-credentials grant (basic auth)
//! - `POST /v2/checkout/orders` create (bearer auth, fresh `PayPal-Request-Id`)
//! - `POST /v2/checkout/orders/{id}/capture` capture (basic auth)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_paypal::PayPalClient;
//! use pay_core::PaymentGateway;
//!
//! // Reads PAYPAL_API, PAYPAL_API_CLIENT, PAYPAL_API_SECRET
//! let gateway = PayPalClient::from_env()?;
//!
//! let token = gateway.authenticate().await?;
//! let remote = gateway
//!     .create_remote_order(&token, intent, &purchase_units, &application_context)
//!     .await?;
//!
//! // Redirect the payer to remote.approval_link
//! ```
//!
//! Token reuse is off unless `PAYPAL_CACHE_TOKENS=true`; every create then
//! authenticates afresh.

pub mod auth;
pub mod client;
pub mod config;
mod wire;

// Re-exports
pub use auth::TOKEN_REFRESH_MARGIN_SECS;
pub use client::PayPalClient;
pub use config::{PayPalConfig, LIVE_API_BASE_URL, SANDBOX_API_BASE_URL};
