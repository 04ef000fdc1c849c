//! # PayPal Orders Client
//!
//! `PaymentGateway` implementation over the PayPal Orders v2 REST API.

use crate::auth::{TokenCache, TokenResponse};
use crate::config::PayPalConfig;
use crate::wire::{CaptureResponse, CreateOrderBody, ErrorBody, OrderResponse};
use async_trait::async_trait;
use pay_core::{
    AccessToken, ApplicationContext, Intent, PaymentError, PaymentGateway, PaymentResult,
    PurchaseUnit, RemoteCapture, RemoteOrder,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Status reported when the gateway could not be reached at all
const TRANSPORT_FAILURE_STATUS: u16 = 500;

/// PayPal gateway client
pub struct PayPalClient {
    config: PayPalConfig,
    client: Client,
    tokens: TokenCache,
}

impl PayPalClient {
    /// Create a new client
    pub fn new(config: PayPalConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            config,
            client,
            tokens: TokenCache::default(),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(PayPalConfig::from_env()?)
    }

    pub fn config(&self) -> &PayPalConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// Client-credentials grant, no caching
    async fn fetch_token(&self) -> PaymentResult<AccessToken> {
        let response = self
            .client
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PaymentError::GatewayAuth(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::GatewayAuth(e.to_string()))?;

        if !status.is_success() {
            error!("PayPal token error: status={}", status);
            let reason = ErrorBody::message_from(&body).unwrap_or_else(|| status.to_string());
            return Err(PaymentError::GatewayAuth(format!("HTTP {}: {}", status, reason)));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            PaymentError::GatewayAuth(format!("Malformed token response: {}", e))
        })?;

        let token = token.into_token()?;
        debug!("Obtained PayPal access token");
        Ok(token)
    }

    /// Turn a gateway response into `T` or a `GatewayRequest` error
    async fn read_response<T: DeserializeOwned>(response: Response) -> PaymentResult<T> {
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            error!("PayPal API error: status={}, body={}", status, body);
            return Err(PaymentError::gateway_request(
                status.as_u16(),
                ErrorBody::message_from(&body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse PayPal response: {}", e))
        })
    }
}

fn transport_error(err: reqwest::Error) -> PaymentError {
    error!("PayPal transport error: {}", err);
    let status = err
        .status()
        .map(|s| s.as_u16())
        .unwrap_or(TRANSPORT_FAILURE_STATUS);
    PaymentError::gateway_request(status, None)
}

/// Gateway order ids are opaque alphanumeric tokens
fn check_order_id(gateway_order_id: &str) -> PaymentResult<()> {
    let valid = !gateway_order_id.is_empty()
        && gateway_order_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(PaymentError::Validation(format!(
            "malformed gateway order id {:?}",
            gateway_order_id
        )));
    }
    Ok(())
}

#[async_trait]
impl PaymentGateway for PayPalClient {
    #[instrument(skip(self), fields(cached = self.config.cache_tokens))]
    async fn authenticate(&self) -> PaymentResult<AccessToken> {
        if !self.config.cache_tokens {
            return self.fetch_token().await;
        }
        self.tokens.get_or_refresh(|| self.fetch_token()).await
    }

    #[instrument(
        skip(self, token, purchase_units, application_context),
        fields(units = purchase_units.len())
    )]
    async fn create_remote_order(
        &self,
        token: &AccessToken,
        intent: Intent,
        purchase_units: &[PurchaseUnit],
        application_context: &ApplicationContext,
    ) -> PaymentResult<RemoteOrder> {
        let body = CreateOrderBody::new(intent, purchase_units, application_context);
        let request_id = Uuid::new_v4().to_string();

        debug!(
            "Creating PayPal order: intent={}, request_id={}",
            intent.as_str(),
            request_id
        );

        let response = self
            .client
            .post(self.url("/v2/checkout/orders"))
            .bearer_auth(token.secret())
            .header("PayPal-Request-Id", &request_id)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let order: OrderResponse = Self::read_response(response).await?;
        let remote = RemoteOrder::from(order);

        info!(
            "Created PayPal order: id={}, status={}",
            remote.gateway_order_id, remote.status
        );
        Ok(remote)
    }

    #[instrument(skip(self))]
    async fn capture_remote_order(&self, gateway_order_id: &str) -> PaymentResult<RemoteCapture> {
        check_order_id(gateway_order_id)?;

        let response = self
            .client
            .post(self.url(&format!("/v2/checkout/orders/{}/capture", gateway_order_id)))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(transport_error)?;

        let capture: CaptureResponse = Self::read_response(response).await?;
        let remote = capture.into_remote(gateway_order_id);

        info!(
            "Captured PayPal order: id={}, status={}",
            remote.gateway_order_id, remote.status
        );
        Ok(remote)
    }

    fn provider_name(&self) -> &'static str {
        "paypal"
    }
}
