//! Rendered fetch: delegate to an external headless rendering service.
//!
//! The service loads the page in a real browser engine, runs its
//! scripts, waits for network idle, and returns the rendered visible
//! text. This crate only ships the client; the request/response shape
//! is the common `{url, formats}` → `{markdown|content, metadata}`
//! rendering-API convention.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult, PipelineError};
use crate::types::FetchMethod;

use super::{FetchAttempt, FetchStrategy};

pub struct RenderedFetch {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    min_content_len: usize,
    budget: Duration,
}

impl RenderedFetch {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        config: &FetchConfig,
    ) -> Result<Self, PipelineError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| PipelineError::Config(format!("renderer endpoint '{}': {}", endpoint, e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.render_timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            min_content_len: config.min_content_len,
            budget: config.render_timeout,
        })
    }
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
    formats: [&'a str; 1],
    #[serde(rename = "waitUntil")]
    wait_until: &'a str,
}

#[derive(Deserialize, Default)]
struct RenderResponse {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    metadata: Option<RenderMetadata>,
}

#[derive(Deserialize, Default)]
struct RenderMetadata {
    #[serde(default)]
    title: Option<String>,
}

#[async_trait]
impl FetchStrategy for RenderedFetch {
    fn method(&self) -> FetchMethod {
        FetchMethod::Rendered
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    async fn attempt(&self, url: &str) -> FetchResult<FetchAttempt> {
        let request = RenderRequest {
            url,
            formats: ["markdown"],
            wait_until: "networkidle",
        };

        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    elapsed_ms: self.budget.as_millis() as u64,
                }
            } else {
                FetchError::Renderer(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Renderer(format!(
                "renderer returned HTTP {} for {}",
                status, url
            )));
        }

        let rendered: RenderResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Renderer(format!("unreadable renderer response: {}", e)))?;

        let content = rendered
            .markdown
            .or(rendered.content)
            .ok_or_else(|| FetchError::Renderer(format!("renderer returned no content for {}", url)))?;

        let got = content.chars().count();
        if got <= self.min_content_len {
            return Err(FetchError::ThinContent {
                got,
                min: self.min_content_len,
            });
        }

        let title = rendered.metadata.and_then(|m| m.title);
        Ok(FetchAttempt { content, title })
    }
}
