//! Fast static fetch: the cheapest rung of the ladder.
//!
//! Plain GET with a browser user agent and a short timeout. Good
//! enough for most cooperative, server-rendered pages.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult, PipelineError};
use crate::types::FetchMethod;

use super::{fetch_document, html, FetchAttempt, FetchStrategy};

pub struct FastStaticFetch {
    client: reqwest::Client,
    min_content_len: usize,
    budget: Duration,
}

impl FastStaticFetch {
    pub fn new(config: &FetchConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(config.fast_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            min_content_len: config.min_content_len,
            budget: config.fast_timeout,
        })
    }
}

#[async_trait]
impl FetchStrategy for FastStaticFetch {
    fn method(&self) -> FetchMethod {
        FetchMethod::FastStatic
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    async fn attempt(&self, url: &str) -> FetchResult<FetchAttempt> {
        let document = fetch_document(&self.client, url, self.budget).await?;

        let title = html::extract_title(&document);
        let content = html::strip_tags(&document);
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
