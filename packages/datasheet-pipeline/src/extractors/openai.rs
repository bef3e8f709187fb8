//! Property extraction through an OpenAI-compatible chat-completions
//! endpoint.
//!
//! The model is asked for a single JSON object mapping property names
//! to values, with `"not found"` for anything the text does not
//! state. Whatever comes back is handed to the adapter as-is; the
//! adapter owns filtering and normalization. Malformed responses
//! degrade to zero fields for that source, never to a pipeline error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ExtractError, ExtractResult, PipelineError};
use crate::extract::{ExtractedField, ProductHint, PropertyExtractor, NOT_FOUND_MARKER};
use crate::types::PropertyDefinition;

/// Default model for extraction calls.
pub const DEFAULT_EXTRACTION_MODEL: &str = "gpt-5-mini";

/// Page text beyond this many characters is truncated before the
/// service call.
pub const MAX_EXTRACT_CHARS: usize = 24_000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAiExtractor {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiExtractor {
    /// Create an extractor with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: DEFAULT_EXTRACTION_MODEL.to_string(),
        })
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, PipelineError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| PipelineError::Config("OPENAI_API_KEY not set".to_string()))?;
        Self::new(api_key)
    }

    /// Point at a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_user_prompt(
        content: &str,
        schema: &[PropertyDefinition],
        hint: &ProductHint,
    ) -> String {
        let mut prompt = String::new();
        prompt.push_str(&format!("Product: {}", hint.product_name));
        if let Some(article_number) = &hint.article_number {
            prompt.push_str(&format!(" (article number {})", article_number));
        }
        prompt.push_str("\n\nProperties to extract:\n");

        for definition in schema {
            prompt.push_str(&format!("- {}", definition.name));
            if let Some(description) = &definition.description {
                prompt.push_str(&format!(": {}", description));
            }
            if let Some(format) = &definition.expected_format {
                prompt.push_str(&format!(" (expected format: {})", format));
            }
            prompt.push('\n');
        }

        let truncated: String = content.chars().take(MAX_EXTRACT_CHARS).collect();
        prompt.push_str("\nPage text:\n");
        prompt.push_str(&truncated);
        prompt
    }
}

const SYSTEM_PROMPT: &str = "You extract technical specification values from product page text. \
Respond with a single JSON object mapping each requested property name, exactly as given, to the \
value stated in the text. Use \"not found\" for properties the text does not state. Copy values \
verbatim including units. Never invent values.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Strip a markdown code fence if the model wrapped its JSON in one.
fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Turn the model's JSON object into extraction fields. Non-string
/// scalars are stringified; nested structures are treated as not
/// found.
fn parse_fields(payload: &str) -> ExtractResult<Vec<ExtractedField>> {
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| ExtractError::MalformedResponse {
            reason: format!("not a JSON object: {}", e),
        })?;

    let object = value.as_object().ok_or_else(|| ExtractError::MalformedResponse {
        reason: "top-level value is not an object".to_string(),
    })?;

    let mut fields = Vec::with_capacity(object.len());
    for (property, value) in object {
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            _ => NOT_FOUND_MARKER.to_string(),
        };
        fields.push(ExtractedField::new(property.clone(), rendered));
    }
    Ok(fields)
}

#[async_trait]
impl PropertyExtractor for OpenAiExtractor {
    async fn extract(
        &self,
        content: &str,
        schema: &[PropertyDefinition],
        hint: &ProductHint,
    ) -> ExtractResult<Vec<ExtractedField>> {
        let user_prompt = Self::build_user_prompt(content, schema, hint);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        };

        debug!(
            model = %self.model,
            properties = schema.len(),
            content_chars = content.chars().count(),
            "extraction request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractError::Timeout
                } else {
                    ExtractError::Service(Box::new(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Service(
                format!("extraction endpoint returned HTTP {}", status).into(),
            ));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::MalformedResponse {
                reason: format!("unreadable completion: {}", e),
            })?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ExtractError::MalformedResponse {
                reason: "completion has no choices".to_string(),
            })?;

        let fields = parse_fields(strip_fences(content))?;
        if fields.is_empty() {
            warn!(model = %self.model, "extraction returned an empty object");
        }
        Ok(fields)
    }
}
