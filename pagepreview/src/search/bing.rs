//! Bing Image Search v7 provider.

use async_trait::async_trait;
use serde::Deserialize;

use super::{ImageSearchOutcome, ImageSearchProvider};
use crate::config::ImageSearchConfig;
use crate::errors::{PipelineError, SearchError};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Bing image search over reqwest.
#[derive(Debug, Clone)]
pub struct BingImageSearch {
    client: reqwest::Client,
    config: ImageSearchConfig,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    value: Vec<ImageResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResult {
    content_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl BingImageSearch {
    /// Builds a provider from configuration.
    pub fn new(config: ImageSearchConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout()?)
            .build()
            .map_err(|e| PipelineError::Setup(format!("Failed to create search client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &ImageSearchConfig {
        &self.config
    }

    fn query_params(&self, query: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("count", self.config.count.to_string()),
            ("safeSearch", self.config.safe_search.clone()),
        ];
        if let Some(ref market) = self.config.market {
            params.push(("mkt", market.clone()));
        }
        params
    }
}

#[async_trait]
impl ImageSearchProvider for BingImageSearch {
    async fn search_images(&self, query: &str) -> ImageSearchOutcome {
        let Some(ref api_key) = self.config.api_key else {
            return ImageSearchOutcome::Failed(SearchError::MissingApiKey);
        };

        let response = match self
            .client
            .get(&self.config.endpoint)
            .header(SUBSCRIPTION_KEY_HEADER, api_key)
            .query(&self.query_params(query))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ImageSearchOutcome::Failed(SearchError::Transport(e.to_string())),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ImageSearchOutcome::Failed(SearchError::Transport(e.to_string())),
        };

        if !(200..300).contains(&status) {
            return ImageSearchOutcome::Failed(SearchError::from_status(
                status,
                error_message(&body),
            ));
        }

        match parse_image_urls(&body) {
            Ok(urls) => ImageSearchOutcome::Found(urls),
            Err(e) => ImageSearchOutcome::Failed(e),
        }
    }
}

/// Extracts `value[].contentUrl` in provider order.
fn parse_image_urls(body: &str) -> Result<Vec<String>, SearchError> {
    let response: ImagesResponse =
        serde_json::from_str(body).map_err(|e| SearchError::MalformedResponse(e.to_string()))?;

    Ok(response
        .value
        .into_iter()
        .filter_map(|image| image.content_url)
        .collect())
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image_urls_keeps_order_and_duplicates() {
        let body = r#"{
            "_type": "Images",
            "value": [
                {"contentUrl": "https://img.example.com/2.jpg", "thumbnailUrl": "t2"},
                {"contentUrl": "https://img.example.com/1.jpg"},
                {"thumbnailUrl": "no-content"},
                {"contentUrl": "https://img.example.com/2.jpg"}
            ]
        }"#;

        let urls = parse_image_urls(body).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://img.example.com/2.jpg",
                "https://img.example.com/1.jpg",
                "https://img.example.com/2.jpg",
            ]
        );
    }

    #[test]
    fn test_parse_missing_value_is_empty() {
        assert!(parse_image_urls(r#"{"_type": "Images"}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        assert!(matches!(
            parse_image_urls("<html>"),
            Err(SearchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error": {"code": "401", "message": "Access denied"}}"#;
        assert_eq!(error_message(body), "Access denied");
        assert_eq!(error_message("nope"), "");
    }

    #[test]
    fn test_query_params_include_market() {
        let mut config = ImageSearchConfig::new().with_count(10);
        config.market = Some("en-GB".to_string());
        let provider = BingImageSearch::new(config).unwrap();

        let params = provider.query_params("red shoes");
        assert!(params.contains(&("q", "red shoes".to_string())));
        assert!(params.contains(&("count", "10".to_string())));
        assert!(params.contains(&("mkt", "en-GB".to_string())));
    }

    #[test]
    fn test_new_rejects_invalid_timeout() {
        let config = ImageSearchConfig {
            timeout_seconds: f64::NAN,
            ..ImageSearchConfig::default()
        };
        assert!(matches!(
            BingImageSearch::new(config),
            Err(PipelineError::Setup(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let provider = BingImageSearch::new(ImageSearchConfig::new()).unwrap();
        let outcome = provider.search_images("shoes").await;
        assert_eq!(outcome, ImageSearchOutcome::Failed(SearchError::MissingApiKey));
    }
}
