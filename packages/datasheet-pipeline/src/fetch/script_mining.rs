//! Script-mining fetch: last-resort, in-process.
//!
//! Re-fetches the raw document and pulls whatever text is reachable
//! without a browser: visible text plus inline script payloads
//! (JSON-LD blocks, serialized state objects). The content bar is
//! lower than for the other rungs because mined payloads are dense.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult, PipelineError};
use crate::types::FetchMethod;

use super::{fetch_document, html, FetchAttempt, FetchStrategy};

pub struct ScriptMiningFetch {
    client: reqwest::Client,
    min_content_len: usize,
    budget: Duration,
}

impl ScriptMiningFetch {
    pub fn new(config: &FetchConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(config.script_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            min_content_len: config.min_script_content_len,
            budget: config.script_timeout,
        })
    }
}

#[async_trait]
impl FetchStrategy for ScriptMiningFetch {
    fn method(&self) -> FetchMethod {
        FetchMethod::ScriptMining
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    async fn attempt(&self, url: &str) -> FetchResult<FetchAttempt> {
        let document = fetch_document(&self.client, url, self.budget).await?;

        let title = html::extract_title(&document);
        let visible = html::strip_tags(&document);
        let mined = html::mine_script_payloads(&document);

        let content = if mined.is_empty() {
            visible
        } else if visible.is_empty() {
            mined
        } else {
            format!("{}\n{}", visible, mined)
        };

        let got = content.chars().count();
        if got <= self.min_content_len {
            return Err(FetchError::ThinContent {
                got,
                min: self.min_content_len,
            });
        }

        Ok(FetchAttempt { content, title })
    }
}
