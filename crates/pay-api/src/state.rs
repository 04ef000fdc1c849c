//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the reconciliation engine, the revenue aggregator and configuration.

use crate::notifier::WebhookNotifier;
use anyhow::Context;
use pay_core::{
    LoggingNotifier, MemoryStore, OrderDefaults, ReconciliationEngine, RevenueAggregator,
    SharedGateway, SharedNotifier, SharedStore, SqliteStore,
};
use pay_paypal::PayPalClient;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this service
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// SQLite URL; the in-memory store is used when absent
    pub database_url: Option<String>,
    /// Bearer token for guarded routes
    pub api_auth_token: Option<String>,
    /// Client origin used for default return/cancel URLs
    pub origin_client: Option<String>,
    /// Overrides the configured brand name
    pub brand_name: Option<String>,
    /// Where confirmations are POSTed; logged only when absent
    pub notify_webhook_url: Option<String>,
    /// HMAC key for the `X-Signature` header
    pub notify_webhook_secret: Option<String>,
    /// Target of the cancel-order redirect
    pub cancel_redirect_url: String,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let base_url = optional_env("BASE_URL").unwrap_or_else(|| format!("http://localhost:{}", port));
        let cancel_redirect_url = optional_env("CANCEL_REDIRECT_URL")
            .unwrap_or_else(|| format!("{}/api/v1/orders/create-order", base_url));

        Self {
            host: optional_env("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            base_url,
            environment: optional_env("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            database_url: optional_env("DATABASE_URL"),
            api_auth_token: optional_env("API_AUTH_TOKEN"),
            origin_client: optional_env("ORIGIN_CLIENT"),
            brand_name: optional_env("BRAND_NAME"),
            notify_webhook_url: optional_env("NOTIFY_WEBHOOK_URL"),
            notify_webhook_secret: optional_env("NOTIFY_WEBHOOK_SECRET"),
            cancel_redirect_url,
            log_format: optional_env("LOG_FORMAT")
                .map(|raw| LogFormat::parse(&raw))
                .unwrap_or(LogFormat::Text),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Environment values win over the file
    pub fn apply_overrides(&self, mut defaults: OrderDefaults) -> OrderDefaults {
        if let Some(origin) = &self.origin_client {
            defaults = defaults.with_client_origin(origin);
        }
        if let Some(brand_name) = &self.brand_name {
            defaults = defaults.with_brand_name(brand_name.clone());
        }
        defaults
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("environment", &self.environment)
            .field("database_url", &self.database_url)
            .field("api_auth_token", &self.api_auth_token.as_ref().map(|_| "<redacted>"))
            .field("origin_client", &self.origin_client)
            .field("brand_name", &self.brand_name)
            .field("notify_webhook_url", &self.notify_webhook_url)
            .field(
                "notify_webhook_secret",
                &self.notify_webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("cancel_redirect_url", &self.cancel_redirect_url)
            .field("log_format", &self.log_format)
            .finish()
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: ReconciliationEngine,
    pub revenue: RevenueAggregator,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Build the production state from the environment
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let gateway = PayPalClient::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize PayPal: {}", e))?;
        info!(
            sandbox = gateway.config().is_sandbox(),
            cache_tokens = gateway.config().cache_tokens,
            "PayPal client ready"
        );

        let store = open_store(&config).await?;
        let notifier = build_notifier(&config)?;
        let defaults = config.apply_overrides(load_order_defaults()?);

        Ok(Self::from_parts(config, Arc::new(gateway), store, notifier, defaults))
    }

    /// Assemble state from already-built parts
    pub fn from_parts(
        config: AppConfig,
        gateway: SharedGateway,
        store: SharedStore,
        notifier: SharedNotifier,
        defaults: OrderDefaults,
    ) -> Self {
        let revenue = RevenueAggregator::new(store.clone());
        let engine = ReconciliationEngine::new(gateway, store, notifier, defaults);
        Self {
            engine,
            revenue,
            config: Arc::new(config),
        }
    }
}

async fn open_store(config: &AppConfig) -> anyhow::Result<SharedStore> {
    match &config.database_url {
        Some(url) => {
            let store = SqliteStore::connect(url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, orders are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn build_notifier(config: &AppConfig) -> anyhow::Result<SharedNotifier> {
    match &config.notify_webhook_url {
        Some(url) => {
            let notifier = WebhookNotifier::new(url.clone(), config.notify_webhook_secret.clone())
                .map_err(|e| anyhow::anyhow!("Failed to initialize notifier: {}", e))?;
            info!(url = %url, signed = config.notify_webhook_secret.is_some(), "Webhook notifications enabled");
            Ok(Arc::new(notifier))
        }
        None => Ok(Arc::new(LoggingNotifier)),
    }
}

/// Load order defaults from config file
fn load_order_defaults() -> anyhow::Result<OrderDefaults> {
    let config_paths = [
        "config/orders.toml",
        "../config/orders.toml",
        "../../config/orders.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let defaults = OrderDefaults::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded order defaults from {}", path);
            return Ok(defaults);
        }
    }

    warn!("No order defaults file found, using built-in defaults");
    Ok(OrderDefaults::default())
}

#[cfg(test)]
pub(crate) fn test_config(api_auth_token: Option<&str>) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 8080,
        base_url: "http://localhost:8080".to_string(),
        environment: "test".to_string(),
        database_url: None,
        api_auth_token: api_auth_token.map(String::from),
        origin_client: None,
        brand_name: None,
        notify_webhook_url: None,
        notify_webhook_secret: None,
        cancel_redirect_url: "https://shop.example/cart".to_string(),
        log_format: LogFormat::Text,
    }
}
