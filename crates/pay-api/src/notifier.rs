//! # Webhook Notifier
//!
//! Posts payment confirmations to an external endpoint. When a secret is
//! configured the raw body is signed with HMAC-SHA256 and the hex digest is
//! sent in `X-Signature`.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use pay_core::{NotificationSink, PaymentError, PaymentResult, Transaction};
use serde::Serialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{info, instrument};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Confirmation payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Confirmation<'a> {
    event: &'static str,
    transaction: &'a Transaction,
}

/// `NotificationSink` that POSTs JSON to a fixed URL
pub struct WebhookNotifier {
    url: String,
    secret: Option<String>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, secret: Option<String>) -> PaymentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PaymentError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            secret,
            client,
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    #[instrument(skip(self, transaction), fields(transaction_id = transaction.id))]
    async fn send_confirmation(&self, transaction: &Transaction) -> PaymentResult<()> {
        let body = serde_json::to_vec(&Confirmation {
            event: "payment.captured",
            transaction,
        })?;

        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign(secret, &body)?);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| PaymentError::Internal(format!("Confirmation webhook failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaymentError::Internal(format!(
                "Confirmation webhook returned {}",
                status
            )));
        }

        info!("Confirmation delivered: status={}", status);
        Ok(())
    }
}

/// Hex HMAC-SHA256 of `body`
pub fn sign(secret: &str, body: &[u8]) -> PaymentResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Configuration(format!("Invalid webhook secret: {}", e)))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
