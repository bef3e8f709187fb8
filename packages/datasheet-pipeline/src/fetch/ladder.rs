//! The strategy ladder: ordered escalation with early exit.
//!
//! Not a hierarchy, just a list walked in order. Each attempt is hard
//! time-bounded; a hung strategy is cut off at its own budget and the
//! ladder moves on. Once a site reveals itself as blocking automated
//! clients, remaining plain-HTTP rungs are skipped.

use std::sync::Arc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::types::FetchMethod;

use super::{FetchAttempt, FetchStrategy};

pub struct FetchLadder {
    strategies: Vec<Arc<dyn FetchStrategy>>,
}

impl FetchLadder {
    /// Build a ladder from explicit strategies, tried in the given
    /// order.
    pub fn new(strategies: Vec<Arc<dyn FetchStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard four-rung ladder: fast static, enhanced static,
    /// rendered (when a renderer endpoint is configured), script
    /// mining.
    pub fn standard(config: &crate::config::FetchConfig) -> Result<Self, crate::error::PipelineError> {
        let mut strategies: Vec<Arc<dyn FetchStrategy>> = vec![
            Arc::new(super::FastStaticFetch::new(config)?),
            Arc::new(super::EnhancedStaticFetch::new(config)?),
        ];
        if let Some(endpoint) = &config.renderer_endpoint {
            strategies.push(Arc::new(super::RenderedFetch::new(
                endpoint,
                config.renderer_api_key.clone(),
                config,
            )?));
        }
        strategies.push(Arc::new(super::ScriptMiningFetch::new(config)?));
        Ok(Self::new(strategies))
    }

    /// Number of rungs.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// True when the ladder has no rungs.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run the ladder for one URL. Returns the first successful
    /// attempt together with the method that produced it, or the last
    /// error once every rung failed.
    pub async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> FetchResult<(FetchAttempt, FetchMethod)> {
        let mut last_error: Option<FetchError> = None;
        let mut blocked = false;

        for strategy in &self.strategies {
            let method = strategy.method();
            if blocked && method.is_static() {
                debug!(url = %url, method = ?method, "site is blocking, skipping static strategy");
                continue;
            }

            let budget = strategy.budget();
            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
                attempt = timeout(budget, strategy.attempt(url)) => match attempt {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout {
                        url: url.to_string(),
                        elapsed_ms: budget.as_millis() as u64,
                    }),
                },
            };

            match outcome {
                Ok(fetched) => {
                    debug!(
                        url = %url,
                        method = ?method,
                        content_length = fetched.content.chars().count(),
                        "strategy succeeded"
                    );
                    return Ok((fetched, method));
                }
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(e) => {
                    blocked = blocked || e.is_blocking();
                    debug!(url = %url, method = ?method, error = %e, "strategy failed, escalating");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::InvalidUrl {
            url: url.to_string(),
        }))
    }
}
