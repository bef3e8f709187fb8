//! Named, tunable constants and configuration for the pipeline.
//!
//! Every heuristic cutoff lives here rather than inline in control
//! flow, so thresholds can be tuned and tested independently.

use std::time::Duration;

/// Minimum visible-text length for a static or rendered fetch to count
/// as a successful acquisition.
pub const MIN_CONTENT_LEN: usize = 1_000;

/// Minimum visible-text length for the last-resort script-mining
/// strategy. Mined payloads are denser than page text, so the bar is
/// lower.
pub const MIN_SCRIPT_CONTENT_LEN: usize = 500;

/// Time budget for the fast static strategy.
pub const FAST_TIMEOUT: Duration = Duration::from_secs(6);

/// Time budget for the enhanced static strategy.
pub const ENHANCED_TIMEOUT: Duration = Duration::from_secs(10);

/// Time budget for the rendered (headless) strategy.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Time budget for the script-mining strategy.
pub const SCRIPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum concurrent source fetches per product.
pub const DEFAULT_SOURCE_CONCURRENCY: usize = 6;

/// Maximum concurrent product pipelines in a batch.
pub const DEFAULT_PRODUCT_CONCURRENCY: usize = 5;

/// An HTML document with fewer elements than this, combined with a
/// script count above [`DYNAMIC_SCRIPT_COUNT`], is classified as a
/// client-framework shell.
pub const DYNAMIC_MIN_ELEMENTS: usize = 40;

/// See [`DYNAMIC_MIN_ELEMENTS`].
pub const DYNAMIC_SCRIPT_COUNT: usize = 8;

/// A `<body>` whose visible text is shorter than this is treated as
/// near-empty (another shell signal).
pub const EMPTY_BODY_LEN: usize = 200;

/// Browser-like User-Agent to avoid trivial bot detection.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for the fetch strategy ladder.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Minimum stripped-text length for static/rendered strategies.
    pub min_content_len: usize,

    /// Minimum text length for the script-mining strategy.
    pub min_script_content_len: usize,

    /// Per-strategy time budgets.
    pub fast_timeout: Duration,
    pub enhanced_timeout: Duration,
    pub render_timeout: Duration,
    pub script_timeout: Duration,

    /// User agent sent by the static strategies.
    pub user_agent: String,

    /// Endpoint of the external headless rendering service. When
    /// absent the rendered rung is left out of the ladder.
    pub renderer_endpoint: Option<String>,

    /// Optional bearer token for the rendering service.
    pub renderer_api_key: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_content_len: MIN_CONTENT_LEN,
            min_script_content_len: MIN_SCRIPT_CONTENT_LEN,
            fast_timeout: FAST_TIMEOUT,
            enhanced_timeout: ENHANCED_TIMEOUT,
            render_timeout: RENDER_TIMEOUT,
            script_timeout: SCRIPT_TIMEOUT,
            user_agent: BROWSER_USER_AGENT.to_string(),
            renderer_endpoint: None,
            renderer_api_key: None,
        }
    }
}

impl FetchConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum content length for static/rendered strategies.
    pub fn with_min_content_len(mut self, len: usize) -> Self {
        self.min_content_len = len;
        self
    }

    /// Set the minimum content length for script mining.
    pub fn with_min_script_content_len(mut self, len: usize) -> Self {
        self.min_script_content_len = len;
        self
    }

    /// Set the rendering service endpoint (enables the rendered rung).
    pub fn with_renderer(mut self, endpoint: impl Into<String>) -> Self {
        self.renderer_endpoint = Some(endpoint.into());
        self
    }

    /// Set the rendering service API key.
    pub fn with_renderer_api_key(mut self, key: impl Into<String>) -> Self {
        self.renderer_api_key = Some(key.into());
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Configuration for the pipeline orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bounded concurrency for source fetches within one product.
    pub source_concurrency: usize,

    /// Bounded concurrency for products within a batch.
    pub product_concurrency: usize,

    /// How many agreeing sources a value needs before it is marked
    /// consistent.
    pub min_consistent_sources: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_concurrency: DEFAULT_SOURCE_CONCURRENCY,
            product_concurrency: DEFAULT_PRODUCT_CONCURRENCY,
            min_consistent_sources: 1,
        }
    }
}

impl PipelineConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set source-level concurrency.
    pub fn with_source_concurrency(mut self, n: usize) -> Self {
        self.source_concurrency = n.max(1);
        self
    }

    /// Set product-level concurrency.
    pub fn with_product_concurrency(mut self, n: usize) -> Self {
        self.product_concurrency = n.max(1);
        self
    }

    /// Set the consistency threshold.
    pub fn with_min_consistent_sources(mut self, n: usize) -> Self {
        self.min_consistent_sources = n.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_clamps_concurrency() {
        let config = PipelineConfig::new()
            .with_source_concurrency(0)
            .with_product_concurrency(0);
        assert_eq!(config.source_concurrency, 1);
        assert_eq!(config.product_concurrency, 1);
    }

    #[test]
    fn test_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.min_content_len, MIN_CONTENT_LEN);
        assert!(config.renderer_endpoint.is_none());

        let pipeline = PipelineConfig::default();
        assert_eq!(pipeline.min_consistent_sources, 1);
    }
}
