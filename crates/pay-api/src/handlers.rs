//! # Request Handlers
//!
//! Axum request handlers for the order API.
//! Every failure is rendered as `{ "error", "code", "details"? }`.

use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    Json,
};
use pay_core::{
    CreateOrderRequest, CreatedOrder, MonthlyRevenue, Order, OrderId, OrderIntent, OrderStats,
    OwnerId, PaymentError, Transaction, UpdateOrderRequest,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// `?token=` sent back by the gateway after approval or cancellation
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

impl TokenQuery {
    fn token(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(response))
}

/// Malformed bodies are validation failures like any other bad field
fn rejection_to_response(rejection: JsonRejection) -> ApiError {
    let err = PaymentError::Validation("Malformed JSON body".to_string());
    let (status, Json(body)) = payment_error_to_response(err);
    (status, Json(body.with_details(rejection.body_text())))
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "order-reconciler",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create an order on the gateway and record it
#[instrument(skip(state, payload))]
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedOrder>), ApiError> {
    let Json(request) = payload.map_err(rejection_to_response)?;

    let created = state.engine.create_order(request).await.map_err(|e| {
        error!("Failed to create order: {}", e);
        payment_error_to_response(e)
    })?;

    info!(
        "Created order: id={}, gateway_order_id={}",
        created.order.id, created.order.gateway_order_id
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// Gateway return URL: capture the approved order
#[instrument(skip(state, query))]
pub async fn capture_order(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Transaction>, ApiError> {
    let token = query.token().ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Token is required, please verify", 400)),
        )
    })?;

    let transaction = state.engine.capture_order(token).await.map_err(|e| {
        error!("Failed to capture order {}: {}", token, e);
        payment_error_to_response(e)
    })?;

    Ok(Json(transaction))
}

/// Gateway cancel URL: mark the order cancelled and send the payer back
#[instrument(skip(state, query))]
pub async fn cancel_order(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> impl IntoResponse {
    if let Some(token) = query.token() {
        if let Err(e) = state.engine.cancel_order(token).await {
            warn!("Could not cancel order {}: {}", token, e);
        }
    }

    (
        StatusCode::FOUND,
        [(LOCATION, state.config.cancel_redirect_url.clone())],
    )
}

/// List all orders
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = state
        .engine
        .list_orders()
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(orders))
}

/// Get single order
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .engine
        .get_order(id)
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(order))
}

/// Revenue totals for an owner
pub async fn order_stats(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
) -> Result<Json<OrderStats>, ApiError> {
    let stats = state
        .revenue
        .order_stats(owner_id)
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(stats))
}

/// Revenue per calendar month for an owner
pub async fn monthly_revenue(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
) -> Result<Json<Vec<MonthlyRevenue>>, ApiError> {
    let revenue = state
        .revenue
        .monthly_revenue(owner_id)
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(revenue))
}

/// Edit local order metadata
#[instrument(skip(state, payload))]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Json(request) = payload.map_err(rejection_to_response)?;
    let order = state
        .engine
        .update_order(id, request)
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(order))
}

/// Remove a local order record
#[instrument(skip(state))]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .delete_order(id)
        .await
        .map_err(payment_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Associate an order with an owner
#[instrument(skip(state))]
pub async fn link_owner(
    State(state): State<AppState>,
    Path((id, owner_id)): Path<(OrderId, OwnerId)>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .link_owner(id, owner_id)
        .await
        .map_err(payment_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create attempts whose remote order was never recorded locally
pub async fn pending_reconciliation(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderIntent>>, ApiError> {
    let pending = state
        .engine
        .pending_reconciliation()
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(pending))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400).with_details("field missing");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["error"], "Test error");
        assert_eq!(value["code"], 400);
        assert_eq!(value["details"], "field missing");

        let bare = serde_json::to_value(ErrorResponse::new("Oops", 500)).unwrap();
        assert!(bare.get("details").is_none());
    }

    #[test]
    fn test_payment_error_conversion() {
        let (status, _) = payment_error_to_response(PaymentError::Validation("Bad data".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, Json(body)) = payment_error_to_response(PaymentError::gateway_request(422, None));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.code, 422);

        let (status, _) = payment_error_to_response(PaymentError::CaptureInProgress {
            gateway_order_id: "PAY-1".into(),
        });
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_token_query_blank() {
        let query = TokenQuery {
            token: Some("   ".into()),
        };
        assert_eq!(query.token(), None);
    }
}
