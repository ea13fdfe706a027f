//! reqwest-backed direct transport.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::protocols::{HttpResponse, HttpTransport};
use crate::config::FetchConfig;
use crate::errors::{FetchError, PipelineError};

/// Direct HTTP transport with retries and a body size cap.
///
/// Retryable statuses and transport failures share one `RetryConfig` budget.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetchConfig,
    timeout: Duration,
}

impl HttpFetcher {
    /// Builds a fetcher from configuration.
    pub fn new(config: FetchConfig) -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Skipping invalid header '{}'", name),
            }
        }

        let timeout = config.timeout()?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .default_headers(headers)
            .build()
            .map_err(|e| PipelineError::Setup(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            timeout,
        })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify(&self, url: &str, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
            FetchError::timeout(url, timeout_ms)
        } else {
            FetchError::transport(url, err.to_string())
        }
    }

    async fn back_off(&self, url: &str, attempt: usize, cause: &str) {
        let delay = self.config.retry.delay_for_attempt(attempt);
        debug!(
            "{} from {}, retrying in {:?} (attempt {})",
            cause,
            url,
            delay,
            attempt + 1
        );
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl HttpTransport for HttpFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            let can_retry = attempt < self.config.retry.max_retries;
            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) => {
                    let error = self.classify(url, &e);
                    if !can_retry {
                        return Err(error);
                    }
                    self.back_off(url, attempt, &error.to_string()).await;
                    attempt += 1;
                    continue;
                }
            };

            let status = response.status().as_u16();
            if can_retry && self.config.retry.should_retry_status(status) {
                self.back_off(url, attempt, &format!("HTTP {status}")).await;
                attempt += 1;
                continue;
            }

            let mut text = response.text().await.map_err(|e| self.classify(url, &e))?;
            truncate_on_char_boundary(&mut text, self.config.max_response_size);

            return Ok(HttpResponse {
                status_code: status,
                text,
                duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            });
        }
    }
}

/// Truncates a string to at most `max_len` bytes without splitting a char.
pub(crate) fn truncate_on_char_boundary(text: &mut String, max_len: usize) {
    if text.len() <= max_len {
        return;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}
