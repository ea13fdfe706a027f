//! Pipeline result type.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorRecord, PipelineError};
use crate::extract::PageMetadata;

/// The externally visible artifact of a pipeline run.
///
/// `image_urls` is always present; `errors` accumulates non-fatal problems
/// from every stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    /// Page metadata, when the page could be fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
    /// Normalized page-level search string; empty when none was derived.
    #[serde(default)]
    pub image_search_string: String,
    /// Merged image URLs.
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Errors recorded along the way.
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
}

impl PipelineResult {
    /// Creates a result carrying only errors.
    #[must_use]
    pub fn from_errors(errors: &[PipelineError]) -> Self {
        Self {
            errors: errors.iter().map(PipelineError::to_record).collect(),
            ..Self::default()
        }
    }

    /// Whether any error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether an error of the given kind prefix was recorded.
    #[must_use]
    pub fn has_error_kind(&self, prefix: &str) -> bool {
        self.errors.iter().any(|e| e.kind.starts_with(prefix))
    }

    /// Serializes to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SearchError;

    #[test]
    fn test_empty_result_shape() {
        let json = PipelineResult::default().to_json();
        assert_eq!(
            json,
            serde_json::json!({"imageSearchString": "", "imageUrls": [], "errors": []})
        );
    }

    #[test]
    fn test_from_errors() {
        let result = PipelineResult::from_errors(&[SearchError::QuotaExceeded.into()]);

        assert!(result.has_errors());
        assert!(result.has_error_kind("search."));
        assert!(!result.has_error_kind("fetch."));
        assert!(result.image_urls.is_empty());
        assert!(result.metadata.is_none());
    }

    #[test]
    fn test_metadata_serialized_when_present() {
        let result = PipelineResult {
            metadata: Some(PageMetadata::new("https://example.com", "Example")),
            image_search_string: "Example".to_string(),
            image_urls: vec!["https://img/1.jpg".to_string()],
            errors: Vec::new(),
        };

        let json = result.to_json();
        assert_eq!(json["metadata"]["url"], "https://example.com");
        assert_eq!(json["imageUrls"][0], "https://img/1.jpg");
    }
}
