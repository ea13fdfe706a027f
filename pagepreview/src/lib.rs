//! # Pagepreview
//!
//! Builds a link preview for a URL: page metadata plus a ranked list of
//! candidate preview images.
//!
//! - **Fetching**: direct HTTP transfer with an optional headless-browser
//!   fallback for pages that refuse plain clients
//! - **Extraction**: title, favicon and a fixed meta-tag precedence chain for
//!   description, image, author and site name
//! - **Query derivation**: page titles stripped of domain and site branding
//! - **Image search**: page-level and domain-level searches run concurrently
//! - **Merging**: interleaved or fixed-offset combination of both result sets
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pagepreview::prelude::*;
//!
//! let config = PreviewConfig::from_env();
//! let pipeline = PreviewPipeline::from_config(&config)?;
//!
//! let result = pipeline.run("https://www.example.com/products/42").await;
//! println!("{}", result.to_json());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod merge;
pub mod pipeline;
pub mod query;
pub mod search;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        DomainFailurePolicy, FetchConfig, FetchStrategy, ImageSearchConfig, MergeStrategy,
        PipelineConfig, PreviewConfig, RenderConfig, RetryConfig,
    };
    pub use crate::domain::DomainInfo;
    pub use crate::errors::{
        CallerMisuseError, DomainResolutionError, ErrorRecord, FetchError, PipelineError,
        SearchError,
    };
    pub use crate::extract::{MetadataExtractor, PageMetadata};
    pub use crate::fetch::{FetchOutcome, FetchStage, HttpFetcher, PageFetcher};
    pub use crate::merge::ResultMerger;
    pub use crate::pipeline::{PipelineResult, PreviewPipeline};
    pub use crate::query::SearchQueryBuilder;
    pub use crate::search::{BingImageSearch, ImageSearchClient, ImageSearchOutcome};
}
