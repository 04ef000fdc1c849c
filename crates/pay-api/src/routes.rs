//! # Routes
//!
//! Axum router configuration for the order API.

use crate::auth::require_bearer;
use crate::handlers;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes (under `/api/v1`):
/// - Public:
///   - GET  /orders - List orders
///   - GET  /orders/{id} - Get order
///   - GET  /orders/capture-order?token= - Capture an approved order
///   - GET  /orders/cancel-order?token= - Cancel and redirect
///   - GET  /orders/stats/{owner_id} - Revenue totals
///   - GET  /orders/revenue/{owner_id} - Monthly revenue
///
/// - Bearer guarded:
///   - POST   /orders/create-order - Create order on the gateway
///   - PATCH  /orders/{id} - Edit order metadata
///   - DELETE /orders/{id} - Delete local order
///   - PUT    /orders/{id}/owners/{owner_id} - Link owner
///   - GET    /orders/reconciliation/pending - Unresolved create attempts
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/orders", get(handlers::list_orders))
        .route("/orders/capture-order", get(handlers::capture_order))
        .route("/orders/cancel-order", get(handlers::cancel_order))
        .route("/orders/stats/{owner_id}", get(handlers::order_stats))
        .route("/orders/revenue/{owner_id}", get(handlers::monthly_revenue))
        .route("/orders/{id}", get(handlers::get_order));

    let guarded_routes = Router::new()
        .route("/orders/create-order", post(handlers::create_order))
        .route(
            "/orders/{id}",
            axum::routing::patch(handlers::update_order).delete(handlers::delete_order),
        )
        .route("/orders/{id}/owners/{owner_id}", put(handlers::link_owner))
        .route(
            "/orders/reconciliation/pending",
            get(handlers::pending_reconciliation),
        )
        .route_layer(middleware::from_fn_with_state(state, require_bearer));

    public_routes.merge(guarded_routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_config;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use pay_core::{
        AccessToken, Amount, ApplicationContext, CaptureRecord, CapturedUnit, GatewayStatus,
        Intent, LoggingNotifier, MemoryStore, OrderDefaults, OrderRepository, Payer,
        PaymentError, PaymentGateway, PaymentResult, PurchaseUnit, RemoteCapture, RemoteOrder,
    };
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    const TOKEN: &str = "test-token";

    /// Gateway double: sequential `PAY-{n}` ids, optional rejection status
    #[derive(Default)]
    struct StubGateway {
        created: AtomicUsize,
        reject_with: Mutex<Option<u16>>,
    }

    impl StubGateway {
        fn rejection(&self) -> Option<PaymentError> {
            self.reject_with
                .lock()
                .unwrap()
                .map(|status| PaymentError::gateway_request(status, None))
        }
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn authenticate(&self) -> PaymentResult<AccessToken> {
            Ok(AccessToken::new(
                "stub",
                chrono::Utc::now() + chrono::Duration::hours(1),
            ))
        }

        async fn create_remote_order(
            &self,
            _token: &AccessToken,
            _intent: Intent,
            _purchase_units: &[PurchaseUnit],
            _application_context: &ApplicationContext,
        ) -> PaymentResult<RemoteOrder> {
            if let Some(err) = self.rejection() {
                return Err(err);
            }
            let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(RemoteOrder {
                gateway_order_id: format!("PAY-{n}"),
                status: GatewayStatus::Created,
                approval_link: Some(format!("https://pay/approve/{n}")),
            })
        }

        async fn capture_remote_order(&self, gateway_order_id: &str) -> PaymentResult<RemoteCapture> {
            if let Some(err) = self.rejection() {
                return Err(err);
            }
            Ok(RemoteCapture {
                gateway_order_id: gateway_order_id.to_string(),
                status: GatewayStatus::Completed,
                payer: Payer {
                    email: "a@b.com".into(),
                    given_name: "Ada".into(),
                    surname: "Lovelace".into(),
                },
                purchase_units: vec![CapturedUnit {
                    reference_id: "ref".into(),
                    captures: vec![CaptureRecord {
                        id: "CAP-1".into(),
                        status: GatewayStatus::Completed,
                        amount: Amount::new("USD", "20.00").unwrap(),
                    }],
                }],
            })
        }

        fn provider_name(&self) -> &'static str {
            "stub"
        }
    }

    struct Harness {
        app: Router,
        gateway: Arc<StubGateway>,
        store: Arc<MemoryStore>,
    }

    fn harness(api_auth_token: Option<&str>) -> Harness {
        let gateway = Arc::new(StubGateway::default());
        let store = Arc::new(MemoryStore::new());
        let state = AppState::from_parts(
            test_config(api_auth_token),
            gateway.clone(),
            store.clone(),
            Arc::new(LoggingNotifier),
            OrderDefaults::default().with_client_origin("https://shop.example"),
        );
        Harness {
            app: create_router(state),
            gateway,
            store,
        }
    }

    fn create_body() -> Value {
        json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "items": [{
                    "name": "Widget",
                    "unit_amount": { "currency_code": "USD", "value": "10.00" },
                    "quantity": 2
                }]
            }]
        })
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(app: &Router) -> Value {
        let response = send(
            app,
            request(Method::POST, "/api/v1/orders/create-order", Some(TOKEN), Some(create_body())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(None);
        let response = send(&h.app, request(Method::GET, "/health", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_create_order() {
        let h = harness(Some(TOKEN));
        let created = create(&h.app).await;

        assert_eq!(created["gateway_order_id"], "PAY-1");
        assert_eq!(created["approval_link"], "https://pay/approve/1");
        assert_eq!(created["status"], "CREATED");
        assert_eq!(created["purchase_units"][0]["amount"]["value"], "20.00");
        assert_eq!(
            created["application_context"]["return_url"],
            "https://shop.example/order/success"
        );
    }

    #[tokio::test]
    async fn test_guard_rejects_missing_or_wrong_token() {
        let h = harness(Some(TOKEN));

        for token in [None, Some("wrong-token")] {
            let response = send(
                &h.app,
                request(Method::POST, "/api/v1/orders/create-order", token, Some(create_body())),
            )
            .await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(h.gateway.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_guard_without_configured_token() {
        let h = harness(None);
        let response = send(
            &h.app,
            request(Method::POST, "/api/v1/orders/create-order", Some(TOKEN), Some(create_body())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let h = harness(Some(TOKEN));
        let response = send(
            &h.app,
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/orders/create-order")
                .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], 400);
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_gateway_rejection_passes_status_through() {
        let h = harness(Some(TOKEN));
        *h.gateway.reject_with.lock().unwrap() = Some(422);

        let response = send(
            &h.app,
            request(Method::POST, "/api/v1/orders/create-order", Some(TOKEN), Some(create_body())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(h.store.find_orders(&Default::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_capture_requires_token() {
        let h = harness(None);
        let response = send(&h.app, request(Method::GET, "/api/v1/orders/capture-order", None, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Token is required, please verify");
    }

    #[tokio::test]
    async fn test_capture_then_double_capture() {
        let h = harness(Some(TOKEN));
        create(&h.app).await;

        let response = send(
            &h.app,
            request(Method::GET, "/api/v1/orders/capture-order?token=PAY-1", None, None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let transaction = json_body(response).await;
        assert_eq!(transaction["gateway_order_id"], "PAY-1");
        assert_eq!(transaction["status"], "COMPLETED");
        assert_eq!(transaction["payer"]["email"], "a@b.com");

        let order = json_body(send(&h.app, request(Method::GET, "/api/v1/orders/1", None, None)).await).await;
        assert_eq!(order["status"], "COMPLETED");

        let again = send(
            &h.app,
            request(Method::GET, "/api/v1/orders/capture-order?token=PAY-1", None, None),
        )
        .await;
        assert_eq!(again.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_cancel_redirects() {
        let h = harness(Some(TOKEN));
        create(&h.app).await;

        let response = send(
            &h.app,
            request(Method::GET, "/api/v1/orders/cancel-order?token=PAY-1", None, None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://shop.example/cart"
        );

        let order = json_body(send(&h.app, request(Method::GET, "/api/v1/orders/1", None, None)).await).await;
        assert_eq!(order["status"], "CANCELLED");

        let unknown = send(
            &h.app,
            request(Method::GET, "/api/v1/orders/cancel-order?token=PAY-404", None, None),
        )
        .await;
        assert_eq!(unknown.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_list_get_update_delete() {
        let h = harness(Some(TOKEN));
        create(&h.app).await;
        create(&h.app).await;

        let list = json_body(send(&h.app, request(Method::GET, "/api/v1/orders", None, None)).await).await;
        assert_eq!(list.as_array().map(Vec::len), Some(2));

        let missing = send(&h.app, request(Method::GET, "/api/v1/orders/99", None, None)).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let patched = send(
            &h.app,
            request(
                Method::PATCH,
                "/api/v1/orders/1",
                Some(TOKEN),
                Some(json!({ "application_context": { "brand_name": "Renamed" } })),
            ),
        )
        .await;
        assert_eq!(patched.status(), StatusCode::OK);
        assert_eq!(json_body(patched).await["application_context"]["brand_name"], "Renamed");

        let unguarded = send(&h.app, request(Method::DELETE, "/api/v1/orders/1", None, None)).await;
        assert_eq!(unguarded.status(), StatusCode::UNAUTHORIZED);

        let deleted = send(&h.app, request(Method::DELETE, "/api/v1/orders/1", Some(TOKEN), None)).await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let again = send(&h.app, request(Method::DELETE, "/api/v1/orders/1", Some(TOKEN), None)).await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_owner_stats_and_revenue() {
        let h = harness(Some(TOKEN));
        create(&h.app).await;

        let linked = send(&h.app, request(Method::PUT, "/api/v1/orders/1/owners/7", Some(TOKEN), None)).await;
        assert_eq!(linked.status(), StatusCode::NO_CONTENT);

        send(
            &h.app,
            request(Method::GET, "/api/v1/orders/capture-order?token=PAY-1", None, None),
        )
        .await;

        let stats = json_body(send(&h.app, request(Method::GET, "/api/v1/orders/stats/7", None, None)).await).await;
        assert_eq!(stats["totalRevenue"], "20.00");
        assert_eq!(stats["totalOrders"], 1);

        let revenue =
            json_body(send(&h.app, request(Method::GET, "/api/v1/orders/revenue/7", None, None)).await).await;
        assert_eq!(revenue.as_array().map(Vec::len), Some(1));
        assert_eq!(revenue[0]["revenue"], "20.00");

        let other = json_body(send(&h.app, request(Method::GET, "/api/v1/orders/stats/8", None, None)).await).await;
        assert_eq!(other["totalOrders"], 0);
    }

    #[tokio::test]
    async fn test_pending_reconciliation_lists_orphans() {
        let h = harness(Some(TOKEN));
        h.store.set_fail_writes(true);

        let response = send(
            &h.app,
            request(Method::POST, "/api/v1/orders/create-order", Some(TOKEN), Some(create_body())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let pending = json_body(
            send(&h.app, request(Method::GET, "/api/v1/orders/reconciliation/pending", Some(TOKEN), None)).await,
        )
        .await;
        assert_eq!(pending.as_array().map(Vec::len), Some(1));
        assert_eq!(pending[0]["gateway_order_id"], "PAY-1");
    }
}
