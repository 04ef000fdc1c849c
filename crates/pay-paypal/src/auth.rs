//! # OAuth2 Client Credentials
//!
//! Token response parsing and the optional token cache.

use chrono::{Duration, Utc};
use pay_core::{AccessToken, PaymentError, PaymentResult};
use serde::Deserialize;
use std::future::Future;
use tokio::sync::Mutex;
use tracing::debug;

/// Tokens are refreshed this long before their reported expiry
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// `POST /v1/oauth2/token` response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: i64,
}

impl TokenResponse {
    /// Fails when `expires_in` does not fit a timestamp
    pub fn into_token(self) -> PaymentResult<AccessToken> {
        let expires_at = Duration::try_seconds(self.expires_in.max(0))
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                PaymentError::GatewayAuth(format!(
                    "Malformed token response: expires_in {} out of range",
                    self.expires_in
                ))
            })?;
        Ok(AccessToken::new(self.access_token, expires_at))
    }
}

/// Holds the last token when caching is enabled
#[derive(Default)]
pub(crate) struct TokenCache {
    slot: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    /// Return the cached token, or run `refresh` and cache its result.
    /// Concurrent callers wait for one refresh instead of racing.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> PaymentResult<AccessToken>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PaymentResult<AccessToken>>,
    {
        let mut slot = self.slot.lock().await;
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        if let Some(token) = slot.as_ref() {
            if !token.expires_within(margin, Utc::now()) {
                debug!("Reusing cached PayPal access token");
                return Ok(token.clone());
            }
        }

        let token = refresh().await?;
        *slot = Some(token.clone());
        Ok(token)
    }
}
