//! Typed errors for the datasheet pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Per-source and
//! per-property failures are absorbed inside the pipeline and
//! downgraded to "no data"; only construction-time configuration
//! problems surface to the caller.

use thiserror::Error;

/// Errors that can occur while fetching a single source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Remote returned a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The site is actively blocking automated clients
    #[error("blocked by {url} (HTTP {status})")]
    Blocked { url: String, status: u16 },

    /// Strategy exceeded its time budget
    #[error("timeout after {elapsed_ms}ms fetching {url}")]
    Timeout { url: String, elapsed_ms: u64 },

    /// Page is a client-framework shell that needs rendering
    #[error("requires client-side rendering: {url}")]
    DynamicContent { url: String },

    /// Fetched text is below the strategy's content threshold
    #[error("thin content: {got} chars (minimum {min})")]
    ThinContent { got: usize, min: usize },

    /// Rendering service call failed
    #[error("renderer error: {0}")]
    Renderer(String),

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Fetch was cancelled
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// True if the error indicates the site is walling off automated
    /// clients, in which case further plain-HTTP attempts are pointless.
    pub fn is_blocking(&self) -> bool {
        match self {
            FetchError::Blocked { .. } => true,
            FetchError::Status { status, .. } => *status == 403,
            FetchError::Http(e) => {
                let msg = e.to_string().to_lowercase();
                msg.contains("403")
                    || msg.contains("forbidden")
                    || msg.contains("access denied")
                    || msg.contains("cloudflare")
            }
            _ => false,
        }
    }
}

/// Errors from the external property-extraction service.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Service call failed
    #[error("extraction service error: {0}")]
    Service(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Service responded with something we could not interpret
    #[error("malformed extraction response: {reason}")]
    MalformedResponse { reason: String },

    /// Service call timed out
    #[error("extraction timed out")]
    Timeout,
}

/// Pipeline-level errors surfaced to the caller.
///
/// Everything per-source or per-property is absorbed; only
/// misconfiguration ends up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid configuration (bad endpoint URL, unbuildable client, ...)
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for extraction-service operations.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_classification() {
        let blocked = FetchError::Blocked {
            url: "https://example.com".into(),
            status: 403,
        };
        assert!(blocked.is_blocking());

        let forbidden = FetchError::Status {
            url: "https://example.com".into(),
            status: 403,
        };
        assert!(forbidden.is_blocking());

        let server_error = FetchError::Status {
            url: "https://example.com".into(),
            status: 500,
        };
        assert!(!server_error.is_blocking());

        let thin = FetchError::ThinContent { got: 10, min: 1000 };
        assert!(!thin.is_blocking());
    }
}
