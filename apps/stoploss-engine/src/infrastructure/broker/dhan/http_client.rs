//! HTTP client wrapper with retry logic.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::config::{DhanConfig, RetryConfig};
use super::error::DhanError;

/// HTTP client for the Dhan API with retry logic.
#[derive(Debug, Clone)]
pub struct DhanHttpClient {
    client: Client,
    client_id: String,
    access_token: String,
    base_url: String,
    retry_config: RetryConfig,
}

impl DhanHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &DhanConfig) -> Result<Self, DhanError> {
        if config.client_id.is_empty() || config.access_token.is_empty() {
            return Err(DhanError::AuthenticationFailed);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DhanError::Network(e.to_string()))?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            access_token: config.access_token.clone(),
            base_url: config.base_url.clone(),
            retry_config: config.retry.clone(),
        })
    }

    /// Make a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DhanError> {
        self.request("GET", path, None::<&()>).await
    }

    /// Make a POST request.
    #[allow(clippy::future_not_send)]
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DhanError> {
        self.request("POST", path, Some(body)).await
    }

    /// Internal request implementation with retry logic.
    #[allow(clippy::future_not_send)]
    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, DhanError> {
        let url = format!("{}{path}", self.base_url);
        let mut backoff = ExponentialBackoff::new(&self.retry_config);

        loop {
            let request = match method {
                "GET" => self
                    .client
                    .get(&url)
                    .header("access-token", &self.access_token)
                    .header("client-id", &self.client_id),
                "POST" => {
                    let mut req = self
                        .client
                        .post(&url)
                        .header("access-token", &self.access_token)
                        .header("client-id", &self.client_id);
                    if let Some(b) = body {
                        req = req.json(b);
                    }
                    req
                }
                _ => {
                    return Err(DhanError::Http(format!("Unsupported method: {method}")));
                }
            };

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Network error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(DhanError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                    });
                }
            };

            let status = response.status();

            if status.is_success() {
                let text = response
                    .text()
                    .await
                    .map_err(|e| DhanError::Network(e.to_string()))?;
                return serde_json::from_str(&text)
                    .map_err(|e| DhanError::JsonParse(e.to_string()));
            }

            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());

            let error_body = response.text().await.unwrap_or_default();
            let (error_code, error_message) = parse_error_body(status, &error_body);

            match categorize_status(status) {
                ErrorCategory::RateLimited => {
                    let delay = retry_after
                        .map(Duration::from_secs)
                        .or_else(|| backoff.next_backoff());
                    if let Some(delay) = delay {
                        tracing::warn!(
                            code = %error_code,
                            delay_ms = delay.as_millis(),
                            "Rate limited, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(DhanError::RateLimited {
                        retry_after_secs: retry_after.unwrap_or(60),
                    });
                }
                ErrorCategory::Retryable => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            code = %error_code,
                            message = %error_message,
                            delay_ms = delay.as_millis(),
                            "Retryable error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(DhanError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                    });
                }
                ErrorCategory::NonRetryable => {
                    return match status {
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            Err(DhanError::AuthenticationFailed)
                        }
                        _ => Err(DhanError::Api {
                            code: error_code,
                            message: error_message,
                        }),
                    };
                }
            }
        }
    }
}

/// Dhan error body: `{"errorType": ..., "errorCode": ..., "errorMessage": ...}`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct DhanErrorResponse {
    error_code: Option<String>,
    error_message: Option<String>,
}

fn parse_error_body(status: StatusCode, body: &str) -> (String, String) {
    match serde_json::from_str::<DhanErrorResponse>(body) {
        Ok(err) => (
            err.error_code
                .unwrap_or_else(|| status.as_u16().to_string()),
            err.error_message.unwrap_or_else(|| body.to_string()),
        ),
        Err(_) => (status.as_u16().to_string(), body.to_string()),
    }
}

/// Error category for determining retry behavior.
enum ErrorCategory {
    RateLimited,
    Retryable,
    NonRetryable,
}

/// Categorize HTTP status code for retry handling.
const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        429 => ErrorCategory::RateLimited,
        408 | 500 | 502 | 503 | 504 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

/// Exponential backoff calculator.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            current_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.multiplier,
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        Some(backoff)
    }
}
