//! # PayPal Configuration
//!
//! Configuration management for the PayPal integration.
//! Credentials are loaded from environment variables.

use pay_core::PaymentError;
use std::env;
use std::fmt;
use std::time::Duration;

/// Sandbox REST endpoint, used when `PAYPAL_API` is not set
pub const SANDBOX_API_BASE_URL: &str = "https://api-m.sandbox.paypal.com";

/// Live REST endpoint
pub const LIVE_API_BASE_URL: &str = "https://api-m.paypal.com";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// PayPal API configuration
#[derive(Clone)]
pub struct PayPalConfig {
    /// REST app client id
    pub client_id: String,

    /// REST app secret
    pub client_secret: String,

    /// API base URL (sandbox, live, or a local double in tests)
    pub api_base_url: String,

    /// Reuse access tokens until shortly before they expire
    pub cache_tokens: bool,

    /// Transport timeout for every gateway request
    pub timeout: Duration,
}

impl PayPalConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `PAYPAL_API_CLIENT`
    /// - `PAYPAL_API_SECRET`
    ///
    /// Optional: `PAYPAL_API`, `PAYPAL_CACHE_TOKENS`, `PAYPAL_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let client_id = env::var("PAYPAL_API_CLIENT").map_err(|_| {
            PaymentError::Configuration("PAYPAL_API_CLIENT not set".to_string())
        })?;

        let client_secret = env::var("PAYPAL_API_SECRET").map_err(|_| {
            PaymentError::Configuration("PAYPAL_API_SECRET not set".to_string())
        })?;

        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(PaymentError::Configuration(
                "PAYPAL_API_CLIENT and PAYPAL_API_SECRET must not be empty".to_string(),
            ));
        }

        let api_base_url =
            env::var("PAYPAL_API").unwrap_or_else(|_| SANDBOX_API_BASE_URL.to_string());

        let cache_tokens = match env::var("PAYPAL_CACHE_TOKENS") {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                PaymentError::Configuration(format!(
                    "PAYPAL_CACHE_TOKENS must be true or false, got {:?}",
                    raw
                ))
            })?,
            Err(_) => false,
        };

        let timeout_secs = match env::var("PAYPAL_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                PaymentError::Configuration(format!(
                    "PAYPAL_TIMEOUT_SECS must be a whole number of seconds, got {:?}",
                    raw
                ))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self::new(client_id, client_secret)
            .with_api_base_url(api_base_url)
            .with_token_cache(cache_tokens)
            .with_timeout(Duration::from_secs(timeout_secs)))
    }

    /// Create config with explicit values (for testing)
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base_url: SANDBOX_API_BASE_URL.to_string(),
            cache_tokens: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Check if pointed at the sandbox
    pub fn is_sandbox(&self) -> bool {
        self.api_base_url.contains("sandbox")
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builder: enable or disable token reuse
    pub fn with_token_cache(mut self, enabled: bool) -> Self {
        self.cache_tokens = enabled;
        self
    }

    /// Builder: set transport timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for PayPalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayPalConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("cache_tokens", &self.cache_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PayPalConfig::new("client-id", "client-secret");
        assert!(config.is_sandbox());
        assert!(!config.cache_tokens);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config =
            PayPalConfig::new("client-id", "client-secret").with_api_base_url("https://api-m.paypal.com/");
        assert_eq!(config.api_base_url, LIVE_API_BASE_URL);
        assert!(!config.is_sandbox());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = PayPalConfig::new("client-id", "client-secret");
        let printed = format!("{:?}", config);
        assert!(printed.contains("client-id"));
        assert!(!printed.contains("client-secret"));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_from_env_missing_client() {
        env::remove_var("PAYPAL_API_CLIENT");

        let result = PayPalConfig::from_env();
        assert!(matches!(result, Err(PaymentError::Configuration(_))));
    }
}
