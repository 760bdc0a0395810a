//! Dhan adapter configuration.

use std::time::Duration;

/// Configuration for the Dhan broker adapter.
#[derive(Debug, Clone)]
pub struct DhanConfig {
    /// Dhan client ID, sent with every request and embedded in orders.
    pub client_id: String,
    /// API access token.
    pub access_token: String,
    /// API base URL, overridable for testing.
    pub base_url: String,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Retry policy configuration.
    pub retry: RetryConfig,
}

impl DhanConfig {
    /// Production API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.dhan.co/v2";

    /// Create a configuration with default timeout and retry policy.
    #[must_use]
    pub fn new(client_id: String, access_token: String) -> Self {
        Self {
            client_id,
            access_token,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}
