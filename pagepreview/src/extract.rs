//! Metadata extraction from page markup.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// Metadata extracted from a web page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    /// The URL the markup was fetched from.
    #[serde(rename = "url")]
    pub source_url: String,
    /// Text of the first `<title>` element; empty when there is none.
    pub title: String,
    /// Shortcut icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    /// Page description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Preview image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Author name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Site name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

impl PageMetadata {
    /// Creates metadata with only the required fields set.
    #[must_use]
    pub fn new(source_url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Sets the site name.
    #[must_use]
    pub fn with_site_name(mut self, site_name: impl Into<String>) -> Self {
        self.site_name = Some(site_name.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Extracts [`PageMetadata`] from markup with a fixed tag precedence.
///
/// For each field the candidates are tried in order:
///
/// 1. `meta[name=NAME]`
/// 2. `meta[name="og:NAME"]`
/// 3. `meta[property="og:NAME"]`
/// 4. `meta[name="twitter:NAME"]`
///
/// Only the first element matching each candidate is consulted, and the
/// first non-blank `content` wins. Values and the title are trimmed.
#[derive(Debug, Clone, Copy)]
pub struct MetadataExtractor {
    resolve_urls: bool,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    /// Creates an extractor that resolves relative favicon and image URLs.
    #[must_use]
    pub fn new() -> Self {
        Self { resolve_urls: true }
    }

    /// Creates an extractor that keeps attribute values verbatim.
    #[must_use]
    pub fn verbatim() -> Self {
        Self { resolve_urls: false }
    }

    /// Extracts metadata from markup.
    #[must_use]
    pub fn extract(&self, markup: &str, source_url: &str) -> PageMetadata {
        let document = Html::parse_document(markup);

        let title = first_text(&document, "title").unwrap_or_default();
        let favicon = first_attr(&document, r#"link[rel="shortcut icon"]"#, "href");
        let image = meta_tag(&document, "image");

        let (favicon, image) = if self.resolve_urls {
            (
                favicon.map(|href| resolve_url(source_url, &href)),
                image.map(|src| resolve_url(source_url, &src)),
            )
        } else {
            (favicon, image)
        };

        PageMetadata {
            source_url: source_url.to_string(),
            title,
            favicon,
            description: meta_tag(&document, "description"),
            image,
            author: meta_tag(&document, "author"),
            site_name: meta_tag(&document, "site_name"),
        }
    }
}

/// Resolves a field through the meta tag precedence chain.
fn meta_tag(document: &Html, name: &str) -> Option<String> {
    let candidates = [
        format!(r#"meta[name="{name}"]"#),
        format!(r#"meta[name="og:{name}"]"#),
        format!(r#"meta[property="og:{name}"]"#),
        format!(r#"meta[name="twitter:{name}"]"#),
    ];

    candidates
        .iter()
        .find_map(|selector| first_attr(document, selector, "content"))
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// Resolves a possibly relative reference against the page URL.
///
/// Values that cannot be resolved are returned unchanged.
fn resolve_url(base: &str, reference: &str) -> String {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return reference.to_string();
    }
    if let Some(rest) = reference.strip_prefix("//") {
        return format!("https://{rest}");
    }
    Url::parse(base)
        .and_then(|base| base.join(reference))
        .map_or_else(|_| reference.to_string(), |u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.example.com/products/42";

    #[test]
    fn test_plain_name_wins_over_og_property() {
        let html = r#"<html><head>
            <meta property="og:description" content="From OG">
            <meta name="description" content="Plain">
        </head></html>"#;

        let meta = MetadataExtractor::new().extract(html, URL);
        assert_eq!(meta.description.as_deref(), Some("Plain"));
    }

    #[test]
    fn test_precedence_chain_order() {
        let html = r#"<html><head>
            <meta name="twitter:image" content="https://cdn.example.com/tw.png">
            <meta property="og:image" content="https://cdn.example.com/og-prop.png">
            <meta name="og:image" content="https://cdn.example.com/og-name.png">
            <meta name="twitter:author" content="@writer">
            <meta property="og:site_name" content="Example Co">
        </head></html>"#;

        let meta = MetadataExtractor::new().extract(html, URL);
        assert_eq!(meta.image.as_deref(), Some("https://cdn.example.com/og-name.png"));
        assert_eq!(meta.author.as_deref(), Some("@writer"));
        assert_eq!(meta.site_name.as_deref(), Some("Example Co"));
    }

    #[test]
    fn test_empty_content_falls_through() {
        let html = r#"<head>
            <meta name="description" content="">
            <meta name="twitter:description" content="Tweeted">
        </head>"#;

        let meta = MetadataExtractor::new().extract(html, URL);
        assert_eq!(meta.description.as_deref(), Some("Tweeted"));
    }

    #[test]
    fn test_blank_content_falls_through_and_values_are_trimmed() {
        let html = r#"<head>
            <meta name="author" content="   ">
            <meta property="og:author" content="  Jane Doe  ">
        </head>"#;

        let meta = MetadataExtractor::new().extract(html, URL);
        assert_eq!(meta.author.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_default_resolves_urls() {
        let html = r#"<head><meta property="og:image" content="/img/cover.png"></head>"#;

        let meta = MetadataExtractor::default().extract(html, URL);
        assert_eq!(meta.image.as_deref(), Some("https://www.example.com/img/cover.png"));
    }

    #[test]
    fn test_title_and_favicon() {
        let html = r#"<html><head>
            <title> First </title>
            <title>Second</title>
            <link rel="shortcut icon" href="/favicon.ico">
        </head></html>"#;

        let meta = MetadataExtractor::new().extract(html, URL);
        assert_eq!(meta.title, "First");
        assert_eq!(meta.favicon.as_deref(), Some("https://www.example.com/favicon.ico"));
    }

    #[test]
    fn test_absent_fields_are_none() {
        let meta = MetadataExtractor::new().extract("<html><body>hi</body></html>", URL);

        assert_eq!(meta.source_url, URL);
        assert_eq!(meta.title, "");
        assert!(meta.favicon.is_none());
        assert!(meta.description.is_none());
        assert!(meta.image.is_none());
        assert!(meta.author.is_none());
        assert!(meta.site_name.is_none());
    }

    #[test]
    fn test_verbatim_keeps_relative_urls() {
        let html = r#"<head><meta property="og:image" content="img/cover.jpg"></head>"#;

        let verbatim = MetadataExtractor::verbatim().extract(html, URL);
        assert_eq!(verbatim.image.as_deref(), Some("img/cover.jpg"));

        let resolved = MetadataExtractor::new().extract(html, URL);
        assert_eq!(resolved.image.as_deref(), Some("https://www.example.com/products/img/cover.jpg"));
    }

    #[test]
    fn test_resolve_protocol_relative() {
        assert_eq!(resolve_url(URL, "//cdn.example.com/a.png"), "https://cdn.example.com/a.png");
        assert_eq!(resolve_url("not a url", "a.png"), "a.png");
    }

    #[test]
    fn test_serializes_with_wire_names() {
        let meta = PageMetadata::new(URL, "Title").with_site_name("Example Co");
        let json = serde_json::to_value(&meta).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"url": URL, "title": "Title", "siteName": "Example Co"})
        );
    }
}
