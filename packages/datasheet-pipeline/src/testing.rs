//! Mock implementations for testing.
//!
//! Canned, in-process stand-ins for the network-facing seams: fetch
//! strategies that serve fixed pages or fail on demand, and a
//! scripted extraction service keyed on content markers. No sockets
//! anywhere.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{ExtractError, ExtractResult, FetchError, FetchResult};
use crate::extract::{ExtractedField, ProductHint, PropertyExtractor};
use crate::fetch::{FetchAttempt, FetchStrategy};
use crate::types::{FetchMethod, PropertyDefinition};

/// How a [`StaticStrategy`] configured with `failing` should fail.
#[derive(Debug, Clone)]
pub enum CannedFailure {
    /// Content below threshold
    Thin,
    /// Dynamic-content heuristic tripped
    Dynamic,
    /// Site is blocking automated clients
    Blocked,
    /// Transport-level failure with the given message
    Http(String),
}

enum CannedBehavior {
    Serve(HashMap<String, String>),
    Fail(CannedFailure),
}

/// Fetch strategy with canned outcomes per URL.
///
/// `serving` returns the configured content for known URLs and a
/// thin-content failure for everything else; `failing` fails every
/// attempt the configured way. Attempted URLs are recorded.
pub struct StaticStrategy {
    method: FetchMethod,
    behavior: CannedBehavior,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl StaticStrategy {
    /// Serve fixed content per URL.
    pub fn serving(method: FetchMethod, pages: &[(&str, &str)]) -> Self {
        let pages = pages
            .iter()
            .map(|(url, content)| (url.to_string(), content.to_string()))
            .collect();
        Self {
            method,
            behavior: CannedBehavior::Serve(pages),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail every attempt.
    pub fn failing(method: FetchMethod, failure: CannedFailure) -> Self {
        Self {
            method,
            behavior: CannedBehavior::Fail(failure),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the recorded attempt URLs.
    pub fn attempts_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait]
impl FetchStrategy for StaticStrategy {
    fn method(&self) -> FetchMethod {
        self.method
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn attempt(&self, url: &str) -> FetchResult<FetchAttempt> {
        self.attempts.lock().unwrap().push(url.to_string());

        match &self.behavior {
            CannedBehavior::Serve(pages) => match pages.get(url) {
                Some(content) => Ok(FetchAttempt {
                    content: content.clone(),
                    title: None,
                }),
                None => Err(FetchError::ThinContent { got: 0, min: 1000 }),
            },
            CannedBehavior::Fail(failure) => Err(match failure {
                CannedFailure::Thin => FetchError::ThinContent { got: 0, min: 1000 },
                CannedFailure::Dynamic => FetchError::DynamicContent {
                    url: url.to_string(),
                },
                CannedFailure::Blocked => FetchError::Blocked {
                    url: url.to_string(),
                    status: 403,
                },
                CannedFailure::Http(message) => FetchError::Http(message.clone().into()),
            }),
        }
    }
}

/// Fetch strategy that sleeps before answering, for timeout and
/// cancellation tests.
pub struct SleepStrategy {
    method: FetchMethod,
    budget: Duration,
    sleep: Duration,
}

impl SleepStrategy {
    pub fn new(method: FetchMethod, budget: Duration, sleep: Duration) -> Self {
        Self {
            method,
            budget,
            sleep,
        }
    }
}

#[async_trait]
impl FetchStrategy for SleepStrategy {
    fn method(&self) -> FetchMethod {
        self.method
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    async fn attempt(&self, _url: &str) -> FetchResult<FetchAttempt> {
        tokio::time::sleep(self.sleep).await;
        Ok(FetchAttempt {
            content: "late content".repeat(200),
            title: None,
        })
    }
}

/// Extraction service with scripted responses keyed on content
/// markers: the first configured marker contained in the source text
/// decides the returned fields. Unknown text extracts nothing.
pub struct ScriptedExtractor {
    responses: Vec<(String, Vec<ExtractedField>)>,
    fail: bool,
    calls: Arc<Mutex<usize>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            fail: false,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Extraction service whose every call fails.
    pub fn failing() -> Self {
        Self {
            responses: Vec::new(),
            fail: true,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Script fields for sources whose content contains `marker`.
    pub fn with_response(mut self, marker: impl Into<String>, fields: Vec<(&str, &str)>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(property, value)| ExtractedField::new(property, value))
            .collect();
        self.responses.push((marker.into(), fields));
        self
    }

    /// Number of extraction calls made.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Default for ScriptedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PropertyExtractor for ScriptedExtractor {
    async fn extract(
        &self,
        content: &str,
        _schema: &[PropertyDefinition],
        _hint: &ProductHint,
    ) -> ExtractResult<Vec<ExtractedField>> {
        *self.calls.lock().unwrap() += 1;

        if self.fail {
            return Err(ExtractError::Service("scripted failure".into()));
        }

        Ok(self
            .responses
            .iter()
            .find(|(marker, _)| content.contains(marker))
            .map(|(_, fields)| fields.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_extractor_matches_markers() {
        let extractor = ScriptedExtractor::new()
            .with_response("alpha", vec![("Gewicht", "12 kg")])
            .with_response("beta", vec![("Gewicht", "15 kg")]);
        let hint = ProductHint {
            product_name: "X".into(),
            article_number: None,
        };

        let fields = extractor
            .extract("page with beta marker", &[], &hint)
            .await
            .unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].value, "15 kg");

        let none = extractor.extract("unrelated", &[], &hint).await.unwrap();
        assert!(none.is_empty());
        assert_eq!(extractor.call_count(), 2);
    }
}
