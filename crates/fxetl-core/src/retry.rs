//! Retry logic with exponential backoff and jitter.
//!
//! [`RetryingHttpClient`] wraps any [`HttpClient`] and re-issues a request on
//! transient failures. Once retries are exhausted it hands back the last
//! response or error unchanged so the calling adapter can classify it.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};

/// Statuses worth retrying: timeouts, throttling and gateway-style failures.
pub const TRANSIENT_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Whether an HTTP status signals a transient upstream condition.
///
/// Matches the statuses [`RetryConfig::default`] retries, so an error is only
/// reported as retryable when the retry layer would have retried it.
pub fn is_transient_status(status: u16) -> bool {
    TRANSIENT_STATUSES.contains(&status)
}

/// Backoff strategy for retrying failed requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed {
        delay: Duration,
    },
    /// `base * factor^attempt`, capped at `max`, optionally jittered by +/- 50%.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(500),
            factor: 2.0,
            max: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let seconds = (base.as_secs_f64() * factor.powi(exponent)).min(max.as_secs_f64());
                let delay = Duration::from_secs_f64(seconds);
                if !jitter {
                    return delay;
                }

                let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                let spread = millis / 2;
                let offset = fastrand::u64(0..=spread.saturating_mul(2));
                Duration::from_millis((millis - spread).saturating_add(offset))
            }
        }
    }
}

/// Configuration for the automatic retry mechanism.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
            retry_on_status: TRANSIENT_STATUSES.to_vec(),
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// An [`HttpClient`] that retries transient failures of an inner client.
pub struct RetryingHttpClient<C> {
    inner: C,
    config: RetryConfig,
}

impl<C: HttpClient> RetryingHttpClient<C> {
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    async fn execute_with_retry(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut attempt = 0;
        loop {
            let outcome = self.inner.execute(request.clone()).await;
            let retry_reason = match &outcome {
                Ok(response) if self.config.should_retry_status(response.status) => {
                    Some(format!("status {}", response.status))
                }
                Err(error) if error.retryable() => Some(error.message().to_owned()),
                _ => None,
            };

            let Some(reason) = retry_reason else {
                return outcome;
            };
            if attempt >= self.config.max_retries {
                tracing::warn!(url = %request.url, attempts = attempt + 1, %reason, "retries exhausted");
                return outcome;
            }

            let delay = self.config.delay_for_attempt(attempt);
            tracing::debug!(
                url = %request.url,
                attempt = attempt + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                %reason,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl<C: HttpClient> HttpClient for RetryingHttpClient<C> {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(self.execute_with_retry(request))
    }
}
