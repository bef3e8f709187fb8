//! Source types: candidate URLs going into the fetcher, fetched
//! content coming out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A candidate URL before fetching. Ephemeral, created per search
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSource {
    /// URL to fetch
    pub url: String,

    /// Title as reported by whoever supplied the URL (search result
    /// title, catalog entry, ...)
    pub title: Option<String>,

    /// When this candidate was requested
    pub requested_at: DateTime<Utc>,
}

impl CandidateSource {
    /// Create a candidate for a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            requested_at: Utc::now(),
        }
    }

    /// Set the candidate title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Which ladder strategy produced a fetched source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchMethod {
    /// Plain GET with a browser user agent, short timeout
    FastStatic,
    /// GET with a full header set plus dynamic-content screening
    EnhancedStatic,
    /// External headless rendering service
    Rendered,
    /// In-process mining of the raw document's script payloads
    ScriptMining,
    /// All strategies failed
    None,
}

impl FetchMethod {
    /// True for the two plain-HTTP rungs.
    pub fn is_static(&self) -> bool {
        matches!(self, FetchMethod::FastStatic | FetchMethod::EnhancedStatic)
    }
}

/// One fetched source: the outcome of running the strategy ladder for
/// a single URL. Immutable once produced; owned by the pipeline run
/// that created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedSource {
    /// URL that was fetched
    pub url: String,

    /// Page title (from the document, falling back to the candidate's)
    pub title: Option<String>,

    /// Visible text content. Empty when `success` is false.
    pub content: String,

    /// Strategy that produced the content
    pub method: FetchMethod,

    /// Length of `content` in characters
    pub content_length: usize,

    /// Stable fingerprint of `content`
    pub content_hash: String,

    /// Whether any strategy succeeded
    pub success: bool,

    /// Last strategy error when all strategies failed
    pub error: Option<String>,

    /// Completion sequence number assigned by the fetcher. Stable
    /// arrival order for deterministic tie-breaking downstream.
    pub arrival_seq: u64,

    /// Wall time spent in the ladder for this URL
    pub elapsed_ms: u64,
}

impl FetchedSource {
    /// Build a successful fetch result.
    pub fn fetched(
        url: impl Into<String>,
        title: Option<String>,
        content: String,
        method: FetchMethod,
        arrival_seq: u64,
        elapsed_ms: u64,
    ) -> Self {
        let content_length = content.chars().count();
        let content_hash = content_fingerprint(&content);
        Self {
            url: url.into(),
            title,
            content,
            method,
            content_length,
            content_hash,
            success: true,
            error: None,
            arrival_seq,
            elapsed_ms,
        }
    }

    /// Build a failed fetch result retaining the last strategy error.
    pub fn failed(
        url: impl Into<String>,
        title: Option<String>,
        error: impl Into<String>,
        arrival_seq: u64,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            url: url.into(),
            title,
            content: String::new(),
            method: FetchMethod::None,
            content_length: 0,
            content_hash: content_fingerprint(""),
            success: false,
            error: Some(error.into()),
            arrival_seq,
            elapsed_ms,
        }
    }
}

/// Fingerprint content for change detection and audit records.
///
/// Line-trimmed before hashing so incidental whitespace differences
/// do not produce distinct fingerprints.
pub fn content_fingerprint(content: &str) -> String {
    let normalized = content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_method_serializes_kebab_case() {
        let json = serde_json::to_string(&FetchMethod::FastStatic).unwrap();
        assert_eq!(json, "\"fast-static\"");
        let json = serde_json::to_string(&FetchMethod::ScriptMining).unwrap();
        assert_eq!(json, "\"script-mining\"");
    }

    #[test]
    fn test_fingerprint_ignores_incidental_whitespace() {
        let a = content_fingerprint("Gewicht: 12 kg\nFarbe: Anthrazit");
        let b = content_fingerprint("  Gewicht: 12 kg  \n\n  Farbe: Anthrazit  ");
        assert_eq!(a, b);

        let c = content_fingerprint("Gewicht: 15 kg");
        assert_ne!(a, c);
    }

    #[test]
    fn test_fetched_source_constructors() {
        let ok = FetchedSource::fetched(
            "https://shop.example.com/p",
            Some("Product".to_string()),
            "some content".to_string(),
            FetchMethod::FastStatic,
            0,
            120,
        );
        assert!(ok.success);
        assert_eq!(ok.content_length, 12);
        assert!(ok.error.is_none());

        let failed = FetchedSource::failed("https://down.example.com", None, "timeout", 1, 6000);
        assert!(!failed.success);
        assert_eq!(failed.method, FetchMethod::None);
        assert_eq!(failed.content_length, 0);
    }
}
