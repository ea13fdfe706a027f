//! Error types for the preview pipeline.
//!
//! Every stage reports failures through one of four error families. Only
//! [`CallerMisuseError`] signals a defect; the others describe external
//! conditions that the pipeline downgrades to partial output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Serializable description of an error, as it appears in the `errors`
/// array of a pipeline result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Error family and variant, e.g. `fetch.timeout`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl ErrorRecord {
    /// Creates a new error record.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// The umbrella error type for pipeline operations.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Page retrieval failed.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// Image search failed.
    #[error("{0}")]
    Search(#[from] SearchError),

    /// The URL has no usable registrable domain.
    #[error("{0}")]
    DomainResolution(#[from] DomainResolutionError),

    /// A component was called with input it cannot accept.
    #[error("{0}")]
    CallerMisuse(#[from] CallerMisuseError),

    /// A collaborator could not be constructed from its configuration.
    #[error("Setup error: {0}")]
    Setup(String),

    /// The caller-imposed deadline elapsed.
    #[error("Pipeline timed out after {timeout_ms}ms")]
    TimedOut {
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },
}

impl PipelineError {
    /// Converts to a serializable record.
    #[must_use]
    pub fn to_record(&self) -> ErrorRecord {
        match self {
            Self::Fetch(e) => e.to_record(),
            Self::Search(e) => e.to_record(),
            Self::DomainResolution(e) => e.to_record(),
            Self::CallerMisuse(e) => ErrorRecord::new("caller_misuse", e.to_string()),
            Self::Setup(_) => ErrorRecord::new("setup", self.to_string()),
            Self::TimedOut { .. } => ErrorRecord::new("pipeline.timeout", self.to_string()),
        }
    }
}

/// Errors raised while retrieving page markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not be sent or the connection failed.
    #[error("Transport error fetching {url}: {reason}")]
    Transport {
        /// The requested URL.
        url: String,
        /// Underlying cause.
        reason: String,
    },

    /// The request exceeded its deadline.
    #[error("Timed out fetching {url} after {timeout_ms}ms")]
    Timeout {
        /// The requested URL.
        url: String,
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The server answered with a non-success status and no body.
    #[error("HTTP {status} with empty body from {url}")]
    Status {
        /// The requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The server answered successfully but the body was empty.
    #[error("Empty body from {url}")]
    EmptyBody {
        /// The requested URL.
        url: String,
    },

    /// The headless browser could not produce markup.
    #[error("Render failed for {url}: {reason}")]
    Render {
        /// The requested URL.
        url: String,
        /// Underlying cause.
        reason: String,
    },
}

impl FetchError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(url: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            url: url.into(),
            timeout_ms,
        }
    }

    /// Creates a status error.
    #[must_use]
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Creates an empty body error.
    #[must_use]
    pub fn empty_body(url: impl Into<String>) -> Self {
        Self::EmptyBody { url: url.into() }
    }

    /// Creates a render error.
    #[must_use]
    pub fn render(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Render {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Fills in the URL of an error raised before the URL was known.
    #[must_use]
    pub fn for_url(mut self, target: &str) -> Self {
        let (Self::Transport { url, .. }
        | Self::Timeout { url, .. }
        | Self::Status { url, .. }
        | Self::EmptyBody { url }
        | Self::Render { url, .. }) = &mut self;
        if url.is_empty() {
            *url = target.to_string();
        }
        self
    }

    /// Converts to a serializable record.
    #[must_use]
    pub fn to_record(&self) -> ErrorRecord {
        let kind = match self {
            Self::Transport { .. } => "fetch.transport",
            Self::Timeout { .. } => "fetch.timeout",
            Self::Status { .. } => "fetch.status",
            Self::EmptyBody { .. } => "fetch.empty_body",
            Self::Render { .. } => "fetch.render",
        };
        ErrorRecord::new(kind, self.to_string())
    }
}

/// Errors raised by the image-search provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The request could not be sent or the connection failed.
    #[error("Image search transport error: {0}")]
    Transport(String),

    /// The provider rejected the credentials.
    #[error("Image search rejected credentials (HTTP {status})")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
    },

    /// The provider refused due to quota or rate limits.
    #[error("Image search quota exceeded")]
    QuotaExceeded,

    /// The provider returned another non-success status.
    #[error("Image search failed with HTTP {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider message, if any.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Malformed image search response: {0}")]
    MalformedResponse(String),

    /// No API key was configured.
    #[error("Image search API key is not configured")]
    MissingApiKey,
}

impl SearchError {
    /// Maps an HTTP status to the matching search error.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status },
            429 => Self::QuotaExceeded,
            _ => Self::Api {
                status,
                message: message.into(),
            },
        }
    }

    /// Converts to a serializable record.
    #[must_use]
    pub fn to_record(&self) -> ErrorRecord {
        let kind = match self {
            Self::Transport(_) => "search.transport",
            Self::Unauthorized { .. } | Self::MissingApiKey => "search.auth",
            Self::QuotaExceeded => "search.quota",
            Self::Api { .. } => "search.api",
            Self::MalformedResponse(_) => "search.malformed_response",
        };
        ErrorRecord::new(kind, self.to_string())
    }
}

/// Errors raised when a URL cannot be reduced to a domain-level query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainResolutionError {
    /// The hostname has no recognizable public suffix.
    #[error("root domain not found for host '{hostname}'")]
    RootDomainNotFound {
        /// The hostname that was analyzed.
        hostname: String,
    },

    /// The registrable domain has no second-level label.
    #[error("sld not found for domain '{domain}'")]
    SecondLevelLabelNotFound {
        /// The registrable domain.
        domain: String,
    },
}

impl DomainResolutionError {
    /// Converts to a serializable record.
    #[must_use]
    pub fn to_record(&self) -> ErrorRecord {
        let kind = match self {
            Self::RootDomainNotFound { .. } => "domain.root_not_found",
            Self::SecondLevelLabelNotFound { .. } => "domain.sld_not_found",
        };
        ErrorRecord::new(kind, self.to_string())
    }
}

/// A component was invoked with input that indicates a logic defect upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Caller misuse in {component}: {message}")]
pub struct CallerMisuseError {
    /// The component that rejected the call.
    pub component: String,
    /// What was wrong with the call.
    pub message: String,
}

impl CallerMisuseError {
    /// Creates a new caller misuse error.
    #[must_use]
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
        }
    }

    /// The error for a search issued with an empty query.
    #[must_use]
    pub fn empty_query() -> Self {
        Self::new("image_search", "No search string for image")
    }
}
