//! Protocol traits for the transport and rendering collaborators.
//!
//! These traits keep the fetch state machine independent of reqwest and
//! chromiumoxide, allowing pluggable implementations and test doubles.

use async_trait::async_trait;

use crate::errors::FetchError;

/// Result of a direct HTTP transfer.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body as text.
    pub text: String,
    /// Time taken to fetch in milliseconds.
    pub duration_ms: f64,
}

impl HttpResponse {
    /// Creates a response with the given status and body.
    #[must_use]
    pub fn new(status_code: u16, text: impl Into<String>) -> Self {
        Self {
            status_code,
            text: text.into(),
            duration_ms: 0.0,
        }
    }

    /// Whether the fetch was successful (2xx status).
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Whether the body contains anything besides whitespace.
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Protocol for direct HTTP transfers.
///
/// Implementations own connection-level timeouts and retries. Transport
/// failures are reported as [`FetchError`]; a response with any status is
/// returned as `Ok`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues a GET request for a URL.
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// Protocol for a headless-browser rendering service.
///
/// Each call to [`Renderer::acquire`] launches a fresh session that the
/// caller must release. Sessions are never shared between fetch attempts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Acquires a new browser session.
    async fn acquire(&self) -> Result<Box<dyn RenderSession>, FetchError>;
}

/// A live browser session scoped to one fetch attempt.
///
/// Dropping a session without calling [`RenderSession::release`] must still
/// tear down the underlying browser; `release` exists to do so gracefully.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigates to a URL, waits for quiescence and returns the serialized
    /// document.
    async fn render(&mut self, url: &str) -> Result<String, FetchError>;

    /// Releases the session. Calling it more than once is a no-op.
    async fn release(&mut self);
}
