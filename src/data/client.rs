//! Blocking HTTP client with retry and exponential backoff.

use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::error::AppError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Knobs shared by the exchange clients and the fetch loop.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Backoff before retry `n` (0-based) is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    pub timeout: Duration,
    /// Pause between consecutive requests in the fetch loop.
    pub delay: Duration,
    pub include_weekends: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            delay: Duration::from_secs(5),
            include_weekends: false,
        }
    }
}

pub struct HttpClient {
    client: Client,
    max_retries: u32,
    backoff_base: Duration,
}

impl HttpClient {
    pub fn new(options: &FetchOptions) -> Result<Self, AppError> {
        // Exchange endpoints are reached directly; system proxy settings are ignored.
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            max_retries: options.max_retries,
            backoff_base: options.backoff_base,
        })
    }

    /// GET `url` and return the body, retrying transient failures.
    pub fn get_text(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        query: &[(&str, String)],
    ) -> Result<String, AppError> {
        let mut attempt = 0u32;
        loop {
            let mut req = self.client.get(url).query(query);
            for &(name, value) in headers {
                req = req.header(name, value);
            }

            let outcome = match req.send() {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .text()
                        .map_err(|e| AppError::new(4, format!("Failed to read response body from {url}: {e}")));
                }
                Ok(resp) if is_retryable_status(resp.status()) => format!("status {}", resp.status()),
                Ok(resp) => {
                    return Err(AppError::new(
                        4,
                        format!("Request to {url} failed with status {}.", resp.status()),
                    ));
                }
                Err(e) => e.to_string(),
            };

            if attempt >= self.max_retries {
                return Err(AppError::new(
                    4,
                    format!("Request to {url} failed after {} attempt(s): {outcome}", attempt + 1),
                ));
            }

            let wait = backoff_delay(self.backoff_base, attempt);
            warn!(url, attempt = attempt + 1, reason = %outcome, wait_ms = wait.as_millis() as u64, "retrying request");
            thread::sleep(wait);
            attempt += 1;
            debug!(url, attempt, "sending retry");
        }
    }
}

/// Statuses worth retrying: rate limiting and transient server errors.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}
