//! Direct fetch with rendered-browser fallback.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::protocols::{HttpTransport, Renderer};
use crate::config::FetchStrategy;
use crate::errors::FetchError;

/// The stage that produced a page's markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStage {
    /// Plain HTTP transfer.
    Direct,
    /// Headless browser transfer.
    Rendered,
}

/// Final outcome of a fetch attempt: markup or the ordered failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Non-empty markup was obtained.
    Markup {
        /// The document markup.
        markup: String,
        /// The stage that produced it.
        stage: FetchStage,
    },
    /// Neither stage produced markup.
    Failed {
        /// Errors from every attempted stage, in order.
        failures: Vec<FetchError>,
    },
}

impl FetchOutcome {
    /// Returns the markup, if any.
    #[must_use]
    pub fn markup(&self) -> Option<&str> {
        match self {
            Self::Markup { markup, .. } => Some(markup),
            Self::Failed { .. } => None,
        }
    }

    /// Returns the recorded failures; empty on success.
    #[must_use]
    pub fn failures(&self) -> &[FetchError] {
        match self {
            Self::Markup { .. } => &[],
            Self::Failed { failures } => failures,
        }
    }
}

/// Retrieves page markup with a `Direct → RenderedFallback → Done` state
/// machine.
///
/// Failures never raise; they are accumulated into [`FetchOutcome::Failed`].
#[derive(Clone)]
pub struct PageFetcher {
    transport: Arc<dyn HttpTransport>,
    renderer: Option<Arc<dyn Renderer>>,
    strategy: FetchStrategy,
    render_timeout: Duration,
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("strategy", &self.strategy)
            .field("has_renderer", &self.renderer.is_some())
            .field("render_timeout", &self.render_timeout)
            .finish()
    }
}

impl PageFetcher {
    /// Creates a fetcher that only performs direct transfers.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            renderer: None,
            strategy: FetchStrategy::DirectOnly,
            render_timeout: Duration::from_secs(30),
        }
    }

    /// Adds a rendering service and enables the fallback stage.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self.strategy = FetchStrategy::DirectWithFallback;
        self
    }

    /// Sets the fetch strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the upper bound on a rendered transfer.
    #[must_use]
    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    /// Gets the active strategy.
    #[must_use]
    pub fn strategy(&self) -> FetchStrategy {
        self.strategy
    }

    /// Fetches a URL, falling back to a rendered transfer when the direct
    /// transfer yields no usable body.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let mut failures = Vec::new();

        match self.fetch_direct(url).await {
            Ok(markup) => {
                return FetchOutcome::Markup {
                    markup,
                    stage: FetchStage::Direct,
                }
            }
            Err(e) => {
                warn!("Direct fetch of {} failed: {}", url, e);
                failures.push(e);
            }
        }

        if self.strategy == FetchStrategy::DirectOnly {
            return FetchOutcome::Failed { failures };
        }

        info!("Falling back to rendered fetch for {}", url);
        match self.fetch_rendered(url).await {
            Ok(markup) => FetchOutcome::Markup {
                markup,
                stage: FetchStage::Rendered,
            },
            Err(e) => {
                warn!("Rendered fetch of {} failed: {}", url, e);
                failures.push(e);
                FetchOutcome::Failed { failures }
            }
        }
    }

    async fn fetch_direct(&self, url: &str) -> Result<String, FetchError> {
        debug!("Direct fetch of {}", url);
        let response = self.transport.get(url).await?;

        if response.has_body() {
            debug!(
                "Direct fetch of {} returned HTTP {} with {} bytes in {:.0}ms",
                url,
                response.status_code,
                response.text.len(),
                response.duration_ms
            );
            return Ok(response.text);
        }

        if response.is_success() {
            Err(FetchError::empty_body(url))
        } else {
            Err(FetchError::status(url, response.status_code))
        }
    }

    async fn fetch_rendered(&self, url: &str) -> Result<String, FetchError> {
        let renderer = self
            .renderer
            .as_ref()
            .ok_or_else(|| FetchError::render(url, "no rendering service configured"))?;

        let mut session = renderer.acquire().await.map_err(|e| e.for_url(url))?;
        let rendered = tokio::time::timeout(self.render_timeout, session.render(url)).await;
        session.release().await;

        let markup = match rendered {
            Ok(result) => result?,
            Err(_) => {
                let timeout_ms = u64::try_from(self.render_timeout.as_millis()).unwrap_or(u64::MAX);
                return Err(FetchError::timeout(url, timeout_ms));
            }
        };

        if markup.trim().is_empty() {
            return Err(FetchError::render(url, "rendered document was empty"));
        }
        Ok(markup)
    }
}
