//! The preview pipeline.
//!
//! Sequencing for one URL:
//!
//! ```text
//! domain analysis ─┬─ domain-level search ───────────────────────────┐
//!                  └─ fetch → extract → build query → page search ───┴─ merge
//! ```
//!
//! The two branches share no data and run concurrently on the calling task.
//! A URL without a registrable domain ends the run early unless the policy is
//! [`DomainFailurePolicy::DisableDomainBranch`]; every other failure is
//! recorded in the result's `errors`.

#[cfg(test)]
mod integration_tests;
mod result;

pub use result::PipelineResult;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{DomainFailurePolicy, PipelineConfig, PreviewConfig};
use crate::domain::DomainInfo;
use crate::errors::PipelineError;
use crate::extract::{MetadataExtractor, PageMetadata};
use crate::fetch::{FetchOutcome, HttpFetcher, PageFetcher};
use crate::merge::ResultMerger;
use crate::query::SearchQueryBuilder;
use crate::search::{BingImageSearch, ImageSearchClient};

/// Output of the page-level branch.
#[derive(Debug, Default)]
struct PageBranch {
    metadata: Option<PageMetadata>,
    query: String,
    images: Vec<String>,
    fetch_errors: Vec<PipelineError>,
    search_errors: Vec<PipelineError>,
}

/// Output of the domain-level branch.
#[derive(Debug, Default)]
struct DomainBranch {
    images: Vec<String>,
    errors: Vec<PipelineError>,
}

/// Orchestrates fetch, extraction, query derivation, search and merge.
#[derive(Debug, Clone)]
pub struct PreviewPipeline {
    fetcher: PageFetcher,
    extractor: MetadataExtractor,
    search: ImageSearchClient,
    merger: ResultMerger,
    config: PipelineConfig,
}

impl PreviewPipeline {
    /// Assembles a pipeline from its collaborators.
    ///
    /// The fetcher's strategy is overridden by `config.fetch_strategy`.
    pub fn new(fetcher: PageFetcher, search: ImageSearchClient, config: PipelineConfig) -> Self {
        Self {
            fetcher: fetcher.with_strategy(config.fetch_strategy),
            extractor: MetadataExtractor::new(),
            search,
            merger: ResultMerger::new(config.merge_strategy),
            config,
        }
    }

    /// Builds a pipeline with the reqwest transport, the chromium renderer
    /// (when the `browser` feature is enabled) and Bing image search.
    pub fn from_config(config: &PreviewConfig) -> Result<Self, PipelineError> {
        let transport = Arc::new(HttpFetcher::new(config.fetch.clone())?);
        let fetcher =
            PageFetcher::new(transport).with_render_timeout(config.render.render_timeout()?);

        #[cfg(feature = "browser")]
        let fetcher = fetcher.with_renderer(Arc::new(crate::fetch::ChromiumRenderer::new(
            config.render.clone(),
        )?));

        let provider = Arc::new(BingImageSearch::new(config.search.clone())?);
        Ok(Self::new(
            fetcher,
            ImageSearchClient::new(provider),
            config.pipeline.clone(),
        ))
    }

    /// Replaces the metadata extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: MetadataExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline for a URL.
    pub async fn run(&self, url: &str) -> PipelineResult {
        info!("Preview pipeline started for {}", url);
        let domain = DomainInfo::analyze(url);
        let mut errors: Vec<PipelineError> = Vec::new();

        let domain_query = match domain.domain_query() {
            Ok(label) => Some(label.to_string()),
            Err(e) => {
                warn!("Domain resolution failed for {}: {}", url, e);
                errors.push(e.into());
                if self.config.domain_failure_policy == DomainFailurePolicy::AbortRequest {
                    return PipelineResult::from_errors(&errors);
                }
                None
            }
        };

        let (domain_branch, page_branch) = futures::join!(
            self.run_domain_branch(domain_query.as_deref()),
            self.run_page_branch(url, &domain),
        );

        errors.extend(page_branch.fetch_errors);
        errors.extend(domain_branch.errors);
        errors.extend(page_branch.search_errors);

        let image_urls = self.merger.merge(page_branch.images, domain_branch.images);

        info!(
            "Preview pipeline finished for {}: {} images, {} errors",
            url,
            image_urls.len(),
            errors.len()
        );

        PipelineResult {
            metadata: page_branch.metadata,
            image_search_string: page_branch.query,
            image_urls,
            errors: errors.iter().map(PipelineError::to_record).collect(),
        }
    }

    /// Runs the pipeline, abandoning it when the deadline elapses.
    ///
    /// Abandoning drops the in-flight future, which tears down any browser
    /// session it owns.
    pub async fn run_with_timeout(&self, url: &str, timeout: Duration) -> PipelineResult {
        if let Ok(result) = tokio::time::timeout(timeout, self.run(url)).await {
            result
        } else {
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            warn!("Preview pipeline for {} timed out after {}ms", url, timeout_ms);
            PipelineResult::from_errors(&[PipelineError::TimedOut { timeout_ms }])
        }
    }

    async fn run_domain_branch(&self, label: Option<&str>) -> DomainBranch {
        let Some(label) = label else {
            return DomainBranch::default();
        };

        match self.search.search(label).await {
            Ok(outcome) => {
                let (images, error) = outcome.into_parts();
                DomainBranch {
                    images,
                    errors: error.map(PipelineError::from).into_iter().collect(),
                }
            }
            Err(misuse) => DomainBranch {
                images: Vec::new(),
                errors: vec![misuse.into()],
            },
        }
    }

    async fn run_page_branch(&self, url: &str, domain: &DomainInfo) -> PageBranch {
        let markup = match self.fetcher.fetch(url).await {
            FetchOutcome::Markup { markup, stage } => {
                debug!("Markup for {} obtained via {:?} stage", url, stage);
                markup
            }
            FetchOutcome::Failed { failures } => {
                return PageBranch {
                    fetch_errors: failures.into_iter().map(PipelineError::from).collect(),
                    ..PageBranch::default()
                };
            }
        };

        let metadata = self.extractor.extract(&markup, url);
        let query = SearchQueryBuilder::build_for_domain(
            &metadata.title,
            domain,
            metadata.site_name.as_deref(),
        );

        let mut branch = PageBranch {
            metadata: Some(metadata),
            ..PageBranch::default()
        };

        if query.is_empty() {
            debug!("No page-level search string for {}", url);
            return branch;
        }

        match self.search.search(&query).await {
            Ok(outcome) => {
                let (images, error) = outcome.into_parts();
                branch.images = images;
                branch.search_errors.extend(error.map(PipelineError::from));
            }
            Err(misuse) => branch.search_errors.push(misuse.into()),
        }
        branch.query = query;
        branch
    }
}
