//! Configuration types for fetching, rendering, image search and the
//! pipeline itself.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::errors::PipelineError;

/// Environment variable holding the image-search API key.
pub const API_KEY_ENV: &str = "PAGEPREVIEW_IMAGE_SEARCH_KEY";

/// Environment variable overriding the image-search endpoint.
pub const ENDPOINT_ENV: &str = "PAGEPREVIEW_IMAGE_SEARCH_ENDPOINT";

/// Configuration for direct HTTP fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_size")]
    pub max_response_size: usize,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Retry configuration.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_timeout() -> f64 {
    15.0
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; pagepreview/0.1)".to_string()
}

fn default_max_size() -> usize {
    5 * 1024 * 1024 // 5MB
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            max_response_size: default_max_size(),
            headers: HashMap::new(),
            retry: RetryConfig::default(),
        }
    }
}

impl FetchConfig {
    /// Creates a new fetch configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Gets timeout as Duration.
    pub fn timeout(&self) -> Result<Duration, PipelineError> {
        seconds("fetch timeout_seconds", self.timeout_seconds)
    }
}

/// Converts a seconds value to a `Duration`, rejecting negative, NaN and
/// overflowing values.
fn seconds(field: &str, value: f64) -> Result<Duration, PipelineError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| PipelineError::Setup(format!("Invalid {field} {value}: {e}")))
}

/// Retry configuration for transient HTTP statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first request.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Initial delay between retries in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: f64,
    /// Backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Maximum delay between retries.
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: f64,
    /// Status codes that should trigger a retry.
    #[serde(default = "default_retry_status_codes")]
    pub retry_status_codes: HashSet<u16>,
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_delay() -> f64 {
    0.5
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay() -> f64 {
    5.0
}

fn default_retry_status_codes() -> HashSet<u16> {
    [429, 500, 502, 503, 504].into_iter().collect()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_seconds: default_max_delay(),
            retry_status_codes: default_retry_status_codes(),
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculates the delay for a given attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.retry_delay_seconds * self.backoff_multiplier.powi(exponent);
        let capped = delay.min(self.max_delay_seconds);
        Duration::try_from_secs_f64(capped).unwrap_or(Duration::ZERO)
    }

    /// Whether a status code should trigger a retry.
    #[must_use]
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }
}

/// Configuration for the rendered-browser fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Upper bound on the network-idle wait after load, in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: f64,
    /// Upper bound on rendering one page once the browser is up, in seconds.
    #[serde(default = "default_render_timeout")]
    pub render_timeout_seconds: f64,
    /// Extra settle time after the load event, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_delay_ms: u64,
    /// Explicit Chrome/Chromium executable. Auto-detected when absent.
    #[serde(default)]
    pub chrome_executable: Option<String>,
    /// Browser window size.
    #[serde(default = "default_window_size")]
    pub window_size: (u32, u32),
    /// Extra command line arguments for the browser.
    #[serde(default = "default_browser_args")]
    pub args: Vec<String>,
}

fn default_idle_timeout() -> f64 {
    30.0
}

fn default_render_timeout() -> f64 {
    45.0
}

fn default_settle_ms() -> u64 {
    500
}

fn default_window_size() -> (u32, u32) {
    (1366, 768)
}

fn default_browser_args() -> Vec<String> {
    vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-first-run".to_string(),
        "--disable-extensions".to_string(),
    ]
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: default_idle_timeout(),
            render_timeout_seconds: default_render_timeout(),
            settle_delay_ms: default_settle_ms(),
            chrome_executable: None,
            window_size: default_window_size(),
            args: default_browser_args(),
        }
    }
}

impl RenderConfig {
    /// Creates a new render configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the quiescence timeout.
    #[must_use]
    pub fn with_idle_timeout(mut self, seconds: f64) -> Self {
        self.idle_timeout_seconds = seconds;
        self
    }

    /// Sets the browser executable.
    #[must_use]
    pub fn with_chrome_executable(mut self, path: impl Into<String>) -> Self {
        self.chrome_executable = Some(path.into());
        self
    }

    /// Gets the quiescence timeout as Duration.
    pub fn idle_timeout(&self) -> Result<Duration, PipelineError> {
        seconds("render idle_timeout_seconds", self.idle_timeout_seconds)
    }

    /// Gets the overall render timeout as Duration.
    pub fn render_timeout(&self) -> Result<Duration, PipelineError> {
        seconds("render render_timeout_seconds", self.render_timeout_seconds)
    }

    /// Gets the settle delay as Duration.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Configuration for the image-search provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct ImageSearchConfig {
    /// Search endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Subscription key. Never logged.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Number of results to request.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Market code, e.g. `en-GB`.
    #[serde(default)]
    pub market: Option<String>,
    /// Safe-search level: `Off`, `Moderate` or `Strict`.
    #[serde(default = "default_safe_search")]
    pub safe_search: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
}

fn default_endpoint() -> String {
    "https://api.bing.microsoft.com/v7.0/images/search".to_string()
}

fn default_count() -> u32 {
    35
}

fn default_safe_search() -> String {
    "Moderate".to_string()
}

impl std::fmt::Debug for ImageSearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSearchConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("count", &self.count)
            .field("market", &self.market)
            .field("safe_search", &self.safe_search)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for ImageSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            count: default_count(),
            market: None,
            safe_search: default_safe_search(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ImageSearchConfig {
    /// Creates a new image-search configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup(ENDPOINT_ENV)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(default_endpoint);

        Self {
            endpoint,
            api_key: lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()),
            ..Self::default()
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the result count.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Gets timeout as Duration.
    pub fn timeout(&self) -> Result<Duration, PipelineError> {
        seconds("search timeout_seconds", self.timeout_seconds)
    }
}

/// How page markup is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStrategy {
    /// Plain HTTP only.
    DirectOnly,
    /// Plain HTTP, then a rendered browser if that yields nothing.
    #[default]
    DirectWithFallback,
}

/// How domain-level and page-level image lists are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Alternate page and domain images, then append the remainder.
    #[default]
    Interleave,
    /// Splice domain images into the page list at fixed positions.
    FixedOffset,
}

/// What to do when the URL has no usable registrable domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainFailurePolicy {
    /// Record the error and skip only the domain-level search.
    DisableDomainBranch,
    /// Record the error and return without page metadata or images.
    #[default]
    AbortRequest,
}

/// Pipeline variation points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fetch strategy.
    #[serde(default)]
    pub fetch_strategy: FetchStrategy,
    /// Merge strategy.
    #[serde(default)]
    pub merge_strategy: MergeStrategy,
    /// Domain resolution failure policy.
    #[serde(default)]
    pub domain_failure_policy: DomainFailurePolicy,
}

impl PipelineConfig {
    /// Creates a new pipeline configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fetch strategy.
    #[must_use]
    pub fn with_fetch_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.fetch_strategy = strategy;
        self
    }

    /// Sets the merge strategy.
    #[must_use]
    pub fn with_merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }

    /// Sets the domain failure policy.
    #[must_use]
    pub fn with_domain_failure_policy(mut self, policy: DomainFailurePolicy) -> Self {
        self.domain_failure_policy = policy;
        self
    }
}

/// Combined configuration for a preview service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Direct fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Rendered fallback configuration.
    #[serde(default)]
    pub render: RenderConfig,
    /// Image-search configuration.
    #[serde(default)]
    pub search: ImageSearchConfig,
    /// Pipeline variation points.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl PreviewConfig {
    /// Creates a configuration with defaults and environment credentials.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            search: ImageSearchConfig::from_env(),
            ..Self::default()
        }
    }
}
