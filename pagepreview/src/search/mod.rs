//! Image search.
//!
//! [`ImageSearchClient`] guards the provider against empty queries and hands
//! back an [`ImageSearchOutcome`]; provider failures are outcomes, not errors.

mod bing;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::{CallerMisuseError, SearchError};

pub use bing::BingImageSearch;

/// Result of one image-search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSearchOutcome {
    /// Image URLs in provider order.
    Found(Vec<String>),
    /// The provider call failed.
    Failed(SearchError),
}

impl ImageSearchOutcome {
    /// Splits the outcome into image URLs (empty on failure) and the error.
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Option<SearchError>) {
        match self {
            Self::Found(urls) => (urls, None),
            Self::Failed(err) => (Vec::new(), Some(err)),
        }
    }

    /// Whether the call succeeded.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Protocol for image-search providers.
///
/// Implementations may assume the query is non-empty.
#[async_trait]
pub trait ImageSearchProvider: Send + Sync {
    /// Searches for images matching a query.
    async fn search_images(&self, query: &str) -> ImageSearchOutcome;
}

/// Front door to an image-search provider.
#[derive(Clone)]
pub struct ImageSearchClient {
    provider: Arc<dyn ImageSearchProvider>,
}

impl std::fmt::Debug for ImageSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSearchClient").finish_non_exhaustive()
    }
}

impl ImageSearchClient {
    /// Wraps a provider.
    pub fn new(provider: Arc<dyn ImageSearchProvider>) -> Self {
        Self { provider }
    }

    /// Searches for images.
    ///
    /// An empty query is a caller defect and the only hard failure.
    pub async fn search(&self, query: &str) -> Result<ImageSearchOutcome, CallerMisuseError> {
        if query.trim().is_empty() {
            return Err(CallerMisuseError::empty_query());
        }

        debug!("Image search for '{}'", query);
        let outcome = self.provider.search_images(query).await;
        match outcome {
            ImageSearchOutcome::Found(ref urls) => {
                debug!("Image search for '{}' returned {} results", query, urls.len());
            }
            ImageSearchOutcome::Failed(ref e) => warn!("Image search for '{}' failed: {}", query, e),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockImageSearch;

    #[tokio::test]
    async fn test_empty_query_is_caller_misuse() {
        let provider = Arc::new(MockImageSearch::new());
        let client = ImageSearchClient::new(provider.clone());

        let result = client.search("   ").await;

        assert_eq!(result, Err(CallerMisuseError::empty_query()));
        assert!(provider.queries().is_empty());
    }

    #[tokio::test]
    async fn test_results_pass_through_in_order() {
        let provider = Arc::new(
            MockImageSearch::new().with_results("red shoes", &["b.jpg", "a.jpg", "b.jpg"]),
        );
        let client = ImageSearchClient::new(provider.clone());

        let outcome = client.search("red shoes").await.unwrap();

        assert_eq!(
            outcome,
            ImageSearchOutcome::Found(vec![
                "b.jpg".to_string(),
                "a.jpg".to_string(),
                "b.jpg".to_string()
            ])
        );
        assert_eq!(provider.queries(), vec!["red shoes".to_string()]);
    }

    #[tokio::test]
    async fn test_provider_failure_is_an_outcome() {
        let provider =
            Arc::new(MockImageSearch::new().with_failure("shoes", SearchError::QuotaExceeded));
        let client = ImageSearchClient::new(provider);

        let outcome = client.search("shoes").await.unwrap();
        assert!(!outcome.is_found());

        let (urls, err) = outcome.into_parts();
        assert!(urls.is_empty());
        assert_eq!(err, Some(SearchError::QuotaExceeded));
    }

    #[test]
    fn test_unknown_query_yields_no_images() {
        let client = ImageSearchClient::new(Arc::new(MockImageSearch::new()));

        let outcome = tokio_test::block_on(client.search("anything")).unwrap();

        assert_eq!(outcome, ImageSearchOutcome::Found(Vec::new()));
    }
}
