//! # Order Reconciler
//!
//! PayPal order and payment reconciliation service.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export PAYPAL_API_CLIENT=...
//! export PAYPAL_API_SECRET=...
//! export API_AUTH_TOKEN=...
//! export DATABASE_URL=sqlite://orders.db
//!
//! # Run the server
//! order-reconciler
//! ```

use pay_api::{routes, state::AppState, AppConfig, LogFormat};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging(AppConfig::from_env().log_format);

    let state = AppState::new().await?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!(
        "Store: {}",
        if state.config.database_url.is_some() { "sqlite" } else { "memory" }
    );
    if state.config.api_auth_token.is_none() {
        tracing::warn!("API_AUTH_TOKEN not set, guarded routes will reject every request");
    }

    let app = routes::create_router(state);

    info!("Order reconciler starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Create: POST http://{}/api/v1/orders/create-order", addr);
        info!("Capture: GET http://{}/api/v1/orders/capture-order?token=...", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
    }
}
