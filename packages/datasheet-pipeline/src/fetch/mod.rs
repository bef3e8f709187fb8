//! Content acquisition: the strategy ladder and the bounded-concurrency
//! source fetcher.
//!
//! Each strategy knows how to turn a URL into renderable text and
//! carries its own success criterion and time budget. The ladder tries
//! them in fixed order, cheapest first, stopping at the first success.

pub mod fetcher;
pub mod html;
pub mod ladder;
pub mod rendered;
pub mod script_mining;
pub mod static_enhanced;
pub mod static_fast;

pub use fetcher::SourceFetcher;
pub use ladder::FetchLadder;
pub use rendered::RenderedFetch;
pub use script_mining::ScriptMiningFetch;
pub use static_enhanced::EnhancedStaticFetch;
pub use static_fast::FastStaticFetch;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{FetchError, FetchResult};
use crate::types::FetchMethod;

/// Output of a single successful strategy attempt.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    /// Visible text content
    pub content: String,

    /// Document title if the strategy saw one
    pub title: Option<String>,
}

/// One rung of the fetch strategy ladder.
///
/// Implementations must be cheap to share across concurrent workers;
/// all state is read-only after construction.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Which method this strategy represents.
    fn method(&self) -> FetchMethod;

    /// Hard time budget for one attempt. The ladder enforces it via
    /// cancellation; a hung attempt cannot overrun it.
    fn budget(&self) -> Duration;

    /// Try to acquire renderable text for the URL.
    async fn attempt(&self, url: &str) -> FetchResult<FetchAttempt>;
}

/// Fetch a document body, mapping transport errors onto the fetch
/// error taxonomy. Shared by the HTTP-speaking strategies.
pub(crate) async fn fetch_document(
    client: &reqwest::Client,
    url: &str,
    budget: Duration,
) -> FetchResult<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_send_error(url, e, budget))?;

    let status = response.status();
    if status == reqwest::StatusCode::FORBIDDEN {
        return Err(FetchError::Blocked {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| FetchError::Http(Box::new(e)))
}

pub(crate) fn classify_send_error(url: &str, e: reqwest::Error, budget: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            elapsed_ms: budget.as_millis() as u64,
        }
    } else if e.is_builder() {
        FetchError::InvalidUrl {
            url: url.to_string(),
        }
    } else {
        FetchError::Http(Box::new(e))
    }
}
