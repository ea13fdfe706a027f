//! Hostname and registrable-domain analysis.
//!
//! The analyzer never fails: a URL without a recognizable public suffix is
//! represented by absent fields that callers branch on.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::errors::DomainResolutionError;

/// Domain breakdown of a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfo {
    /// Hostname with scheme, path, port and query removed.
    pub hostname: String,
    /// Registrable root domain (e.g. `example.co.uk`).
    pub registrable_domain: Option<String>,
    /// Label immediately preceding the public suffix (e.g. `example`).
    pub second_level_label: Option<String>,
}

impl DomainInfo {
    /// Analyzes a URL.
    #[must_use]
    pub fn analyze(url: &str) -> Self {
        let hostname = extract_hostname(url);
        let registrable_domain = registrable_domain(&hostname);
        let second_level_label = registrable_domain.as_deref().and_then(second_level_label);

        Self {
            hostname,
            registrable_domain,
            second_level_label,
        }
    }

    /// Returns the label to use as a domain-level search query.
    ///
    /// Fails when either the registrable domain or its second-level label
    /// is missing.
    pub fn domain_query(&self) -> Result<&str, DomainResolutionError> {
        let domain = self.registrable_domain.as_deref().ok_or_else(|| {
            DomainResolutionError::RootDomainNotFound {
                hostname: self.hostname.clone(),
            }
        })?;

        self.second_level_label
            .as_deref()
            .filter(|label| !label.is_empty())
            .ok_or_else(|| DomainResolutionError::SecondLevelLabelNotFound {
                domain: domain.to_string(),
            })
    }
}

/// Strips scheme, path, port and query from a URL, leaving the hostname.
#[must_use]
pub fn extract_hostname(url: &str) -> String {
    let host = if url.contains("//") {
        url.split('/').nth(2).unwrap_or_default()
    } else {
        url.split('/').next().unwrap_or_default()
    };

    let host = host.split(':').next().unwrap_or_default();
    let host = host.split('?').next().unwrap_or_default();
    host.to_ascii_lowercase()
}

/// Looks up the public-suffix-aware registrable domain of a hostname.
#[must_use]
pub fn registrable_domain(hostname: &str) -> Option<String> {
    let hostname = hostname.trim_end_matches('.');
    if hostname.is_empty() || hostname.parse::<IpAddr>().is_ok() {
        return None;
    }

    let domain = psl::domain(hostname.as_bytes())?;
    if !domain.suffix().is_known() {
        return None;
    }

    std::str::from_utf8(domain.as_bytes()).ok().map(String::from)
}

/// Derives the second-level label of a registrable domain.
#[must_use]
pub fn second_level_label(domain: &str) -> Option<String> {
    let suffix = psl::suffix(domain.as_bytes())?;
    let suffix = std::str::from_utf8(suffix.as_bytes()).ok()?;

    let label = domain.strip_suffix(suffix)?.strip_suffix('.')?;
    // A registrable domain is exactly one label above its suffix.
    let label = label.rsplit('.').next()?;
    (!label.is_empty()).then(|| label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_hostname_variants() {
        assert_eq!(extract_hostname("https://www.example.com/a/b?c=d"), "www.example.com");
        assert_eq!(extract_hostname("http://example.com:8080/path"), "example.com");
        assert_eq!(extract_hostname("example.com/path"), "example.com");
        assert_eq!(extract_hostname("example.com?q=1"), "example.com");
        assert_eq!(extract_hostname("HTTPS://WWW.Example.COM"), "www.example.com");
    }

    #[test]
    fn test_analyze_simple_domain() {
        let info = DomainInfo::analyze("https://www.example.com/products/1");

        assert_eq!(info.hostname, "www.example.com");
        assert_eq!(info.registrable_domain.as_deref(), Some("example.com"));
        assert_eq!(info.second_level_label.as_deref(), Some("example"));
        assert_eq!(info.domain_query(), Ok("example"));
    }

    #[test]
    fn test_analyze_multi_label_suffix() {
        let info = DomainInfo::analyze("https://www.amazon.co.uk/dp/B07747FR44/ref=gw");

        assert_eq!(info.registrable_domain.as_deref(), Some("amazon.co.uk"));
        assert_eq!(info.second_level_label.as_deref(), Some("amazon"));
    }

    #[test]
    fn test_analyze_unresolvable_hosts() {
        for url in ["http://localhost:3000/", "http://127.0.0.1/x", "https://", "not a url"] {
            let info = DomainInfo::analyze(url);
            assert!(info.registrable_domain.is_none(), "{url} should not resolve");
            assert!(matches!(
                info.domain_query(),
                Err(DomainResolutionError::RootDomainNotFound { .. })
            ));
        }
    }

    #[test]
    fn test_bare_suffix_has_no_domain() {
        assert!(registrable_domain("co.uk").is_none());
    }

    #[test]
    fn test_second_level_label() {
        assert_eq!(second_level_label("example.com").as_deref(), Some("example"));
        assert_eq!(second_level_label("bbc.co.uk").as_deref(), Some("bbc"));
    }
}
