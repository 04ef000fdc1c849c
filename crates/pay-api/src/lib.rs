//! # pay-api
//!
//! HTTP API layer for order-reconciler-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for the order lifecycle and revenue reports
//! - Bearer guard for mutating routes
//! - Webhook sink for payment confirmations
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/orders/create-order` | Create order (guarded) |
//! | GET | `/api/v1/orders/capture-order?token=` | Capture approved order |
//! | GET | `/api/v1/orders/cancel-order?token=` | Cancel and redirect |
//! | GET | `/api/v1/orders` | List orders |
//! | GET | `/api/v1/orders/{id}` | Get order |
//! | PATCH | `/api/v1/orders/{id}` | Edit order (guarded) |
//! | DELETE | `/api/v1/orders/{id}` | Delete order (guarded) |
//! | PUT | `/api/v1/orders/{id}/owners/{owner_id}` | Link owner (guarded) |
//! | GET | `/api/v1/orders/stats/{owner_id}` | Revenue totals |
//! | GET | `/api/v1/orders/revenue/{owner_id}` | Monthly revenue |
//! | GET | `/api/v1/orders/reconciliation/pending` | Orphaned creates (guarded) |

pub mod auth;
pub mod handlers;
pub mod notifier;
pub mod routes;
pub mod state;

pub use notifier::WebhookNotifier;
pub use routes::create_router;
pub use state::{AppConfig, AppState, LogFormat};
