//! Page retrieval.
//!
//! This module provides:
//! - Protocol traits for the HTTP transport and the rendering service
//! - A reqwest transport with retries
//! - A chromiumoxide rendering service (feature `browser`)
//! - The fetch-with-fallback state machine

#[cfg(feature = "browser")]
mod browser;
mod fallback;
mod http;
mod protocols;

#[cfg(feature = "browser")]
pub use browser::ChromiumRenderer;
pub use fallback::{FetchOutcome, FetchStage, PageFetcher};
pub use http::HttpFetcher;
pub use protocols::{HttpResponse, HttpTransport, RenderSession, Renderer};
