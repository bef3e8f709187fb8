//! Enhanced static fetch: fuller headers, longer timeout, and a
//! dynamic-content screen.
//!
//! Before accepting a document this rung classifies it with the
//! client-framework heuristic; a shell page fails here regardless of
//! raw length so the ladder escalates to rendering.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult, PipelineError};
use crate::types::FetchMethod;

use super::{fetch_document, html, FetchAttempt, FetchStrategy};

pub struct EnhancedStaticFetch {
    client: reqwest::Client,
    min_content_len: usize,
    budget: Duration,
}

impl EnhancedStaticFetch {
    pub fn new(config: &FetchConfig) -> Result<Self, PipelineError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .parse()
                .unwrap(),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            "de-DE,de;q=0.8,en-US,en;q=0.5".parse().unwrap(),
        );
        headers.insert(reqwest::header::CONNECTION, "keep-alive".parse().unwrap());
        headers.insert(
            reqwest::header::UPGRADE_INSECURE_REQUESTS,
            "1".parse().unwrap(),
        );

        let client = reqwest::Client::builder()
            .timeout(config.enhanced_timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            min_content_len: config.min_content_len,
            budget: config.enhanced_timeout,
        })
    }
}

#[async_trait]
impl FetchStrategy for EnhancedStaticFetch {
    fn method(&self) -> FetchMethod {
        FetchMethod::EnhancedStatic
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    async fn attempt(&self, url: &str) -> FetchResult<FetchAttempt> {
        let document = fetch_document(&self.client, url, self.budget).await?;

        if html::looks_dynamic(&document) {
            return Err(FetchError::DynamicContent {
                url: url.to_string(),
            });
        }

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
