//! Mock collaborators for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{FetchError, SearchError};
use crate::fetch::{HttpResponse, HttpTransport, RenderSession, Renderer};
use crate::search::{ImageSearchOutcome, ImageSearchProvider};

/// A transport that returns a fixed result and records requested URLs.
#[derive(Debug)]
pub struct MockTransport {
    result: Mutex<Result<HttpResponse, FetchError>>,
    urls: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Creates a transport that always answers with the given response.
    #[must_use]
    pub fn ok(response: HttpResponse) -> Self {
        Self {
            result: Mutex::new(Ok(response)),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a transport that always fails.
    #[must_use]
    pub fn failing(error: FetchError) -> Self {
        Self {
            result: Mutex::new(Err(error)),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of requests made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.urls.lock().len()
    }

    /// Returns the requested URLs.
    #[must_use]
    pub fn requested_urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.urls.lock().push(url.to_string());
        self.result.lock().clone()
    }
}

/// A renderer whose sessions return a fixed result after an optional delay.
///
/// Acquisitions, releases and sessions dropped without `release` are counted
/// so tests can assert that every session is torn down.
#[derive(Debug)]
pub struct MockRenderer {
    result: Result<String, FetchError>,
    acquire_error: Option<FetchError>,
    delay: Duration,
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    abandoned: Arc<AtomicUsize>,
}

impl MockRenderer {
    /// Creates a renderer that produces the given markup.
    #[must_use]
    pub fn ok(markup: impl Into<String>) -> Self {
        Self::with_result(Ok(markup.into()))
    }

    /// Creates a renderer whose sessions fail to render.
    #[must_use]
    pub fn failing(error: FetchError) -> Self {
        Self::with_result(Err(error))
    }

    /// Creates a renderer whose sessions cannot be acquired.
    #[must_use]
    pub fn unavailable(error: FetchError) -> Self {
        Self {
            acquire_error: Some(error.clone()),
            ..Self::with_result(Err(error))
        }
    }

    fn with_result(result: Result<String, FetchError>) -> Self {
        Self {
            result,
            acquire_error: None,
            delay: Duration::ZERO,
            acquired: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
            abandoned: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delays every render by the given duration.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of sessions acquired.
    #[must_use]
    pub fn acquire_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Returns the number of sessions released.
    #[must_use]
    pub fn release_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Returns the number of sessions dropped without being released.
    #[must_use]
    pub fn abandoned_count(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn acquire(&self) -> Result<Box<dyn RenderSession>, FetchError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        if let Some(ref error) = self.acquire_error {
            return Err(error.clone());
        }
        Ok(Box::new(MockSession {
            result: self.result.clone(),
            delay: self.delay,
            released: Arc::clone(&self.released),
            abandoned: Arc::clone(&self.abandoned),
            open: true,
        }))
    }
}

struct MockSession {
    result: Result<String, FetchError>,
    delay: Duration,
    released: Arc<AtomicUsize>,
    abandoned: Arc<AtomicUsize>,
    open: bool,
}

impl Drop for MockSession {
    fn drop(&mut self) {
        if self.open {
            self.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl RenderSession for MockSession {
    async fn render(&mut self, _url: &str) -> Result<String, FetchError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }

    async fn release(&mut self) {
        if std::mem::replace(&mut self.open, false) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// An image-search provider with canned results per query.
///
/// Unknown queries return an empty result set.
#[derive(Debug, Default)]
pub struct MockImageSearch {
    outcomes: HashMap<String, ImageSearchOutcome>,
    queries: Mutex<Vec<String>>,
}

impl MockImageSearch {
    /// Creates a provider with no canned results.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers results for a query.
    #[must_use]
    pub fn with_results(mut self, query: impl Into<String>, urls: &[&str]) -> Self {
        self.outcomes.insert(
            query.into(),
            ImageSearchOutcome::Found(urls.iter().map(|u| (*u).to_string()).collect()),
        );
        self
    }

    /// Registers a failure for a query.
    #[must_use]
    pub fn with_failure(mut self, query: impl Into<String>, error: SearchError) -> Self {
        self.outcomes
            .insert(query.into(), ImageSearchOutcome::Failed(error));
        self
    }

    /// Returns the queries received, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl ImageSearchProvider for MockImageSearch {
    async fn search_images(&self, query: &str) -> ImageSearchOutcome {
        self.queries.lock().push(query.to_string());
        self.outcomes
            .get(query)
            .cloned()
            .unwrap_or_else(|| ImageSearchOutcome::Found(Vec::new()))
    }
}
