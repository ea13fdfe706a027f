//! Image-search query derivation from page titles.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::domain::DomainInfo;

/// Characters replaced by a single space during normalization.
pub const FORBIDDEN_CHARS: &[char] = &[
    '&', '/', '\\', '#', ',', '+', '(', ')', '$', '~', '%', '.', '\'', '"', ':', '*', '?', '<',
    '>', '{', '}', '|', '—',
];

/// Builds a page-level image-search query from a title.
///
/// Normalization, in order:
///
/// 1. remove the registrable root domain (case-insensitive)
/// 2. remove the site name (case-insensitive), if any
/// 3. remove the second-level label as a whole word (case-insensitive)
/// 4. replace [`FORBIDDEN_CHARS`] with spaces
/// 5. trim
///
/// An empty result means no page-level search is possible.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchQueryBuilder;

impl SearchQueryBuilder {
    /// Builds a query, resolving the domain from the source URL.
    #[must_use]
    pub fn build(title: &str, source_url: &str, site_name: Option<&str>) -> String {
        Self::build_for_domain(title, &DomainInfo::analyze(source_url), site_name)
    }

    /// Builds a query against an already analyzed domain.
    #[must_use]
    pub fn build_for_domain(title: &str, domain: &DomainInfo, site_name: Option<&str>) -> String {
        let mut text = title.to_string();

        if let Some(ref root) = domain.registrable_domain {
            text = remove_all(&text, &regex::escape(root));
        }
        if let Some(site_name) = site_name.map(str::trim).filter(|s| !s.is_empty()) {
            text = remove_all(&text, &regex::escape(site_name));
        }
        if let Some(ref label) = domain.second_level_label {
            text = remove_all(&text, &format!(r"\b{}\b", regex::escape(label)));
        }

        let query = text
            .chars()
            .map(|c| if FORBIDDEN_CHARS.contains(&c) { ' ' } else { c })
            .collect::<String>()
            .trim()
            .to_string();

        debug!("Derived image search string '{}' from title '{}'", query, title);
        query
    }
}

fn remove_all(text: &str, pattern: &str) -> String {
    case_insensitive(pattern).map_or_else(
        || text.to_string(),
        |re| re.replace_all(text, "").into_owned(),
    )
}

fn case_insensitive(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern).case_insensitive(true).build().ok()
}
