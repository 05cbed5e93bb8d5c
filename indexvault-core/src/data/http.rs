//! Blocking JSON GET with retry, backoff, and the shared circuit breaker.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use super::provider::DataError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// HTTP client used by the vendor providers.
pub struct JsonFetcher {
    client: reqwest::blocking::Client,
    breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl JsonFetcher {
    pub fn new(breaker: Arc<CircuitBreaker>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// GET `url` with `query` and decode the JSON body.
    ///
    /// `Ok(None)` means HTTP 404. 403 trips the breaker and fails immediately;
    /// 429, 5xx and connect/timeout errors are retried with exponential backoff.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        label: &str,
    ) -> Result<Option<T>, DataError> {
        if !self.breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(label, attempt, ?delay, "retrying");
                std::thread::sleep(delay);
            }

            if !self.breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(url).query(query).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == StatusCode::FORBIDDEN {
                warn!(label, "HTTP 403, tripping circuit breaker");
                self.breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                self.breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(DataError::AuthenticationRequired(format!(
                    "HTTP 401 for {label}"
                )));
            }

            if status == StatusCode::NOT_FOUND {
                self.breaker.record_success();
                return Ok(None);
            }

            if !status.is_success() {
                self.breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {label}")));
                continue;
            }

            let body: T = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse response for {label}: {e}"))
            })?;
            self.breaker.record_success();
            return Ok(Some(body));
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}
