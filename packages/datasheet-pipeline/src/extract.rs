//! Extraction adapter: turn fetched sources into per-property
//! candidates via the external extraction service.
//!
//! The service is a black box behind [`PropertyExtractor`]. Whatever
//! it returns is filtered against the requested schema, stripped of
//! not-found markers, and normalized into comparison keys. A failing
//! service call means that source contributes nothing; it is never
//! fatal.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::ExtractResult;
use crate::types::{Candidate, FetchedSource, PropertyDefinition};

/// Marker the extraction service uses for properties the text does
/// not state. Compared case-insensitively.
pub const NOT_FOUND_MARKER: &str = "not found";

/// Product identity passed to the extraction service alongside the
/// page text, so it can tell the requested product apart from
/// accessories and cross-sells on the same page.
#[derive(Debug, Clone)]
pub struct ProductHint {
    pub product_name: String,
    pub article_number: Option<String>,
}

/// One property value as returned by the extraction service, before
/// filtering and normalization.
#[derive(Debug, Clone)]
pub struct ExtractedField {
    pub property: String,
    pub value: String,
}

impl ExtractedField {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }

    /// True when the value is the explicit not-found marker or blank.
    pub fn is_not_found(&self) -> bool {
        let value = self.value.trim();
        value.is_empty() || value.eq_ignore_ascii_case(NOT_FOUND_MARKER)
    }
}

/// The external language-model extraction service, specified only at
/// this boundary.
#[async_trait]
pub trait PropertyExtractor: Send + Sync {
    /// Extract values for the given properties from one source's
    /// text. Implementations may return fewer fields than requested
    /// (missing means not found) and may return properties that were
    /// never asked for (the adapter drops them).
    async fn extract(
        &self,
        content: &str,
        schema: &[PropertyDefinition],
        hint: &ProductHint,
    ) -> ExtractResult<Vec<ExtractedField>>;
}

/// Build the comparison key for a raw value: trimmed, case-folded,
/// whitespace runs collapsed, and the gap between a number and its
/// unit removed so `12 kg` and `12kg` compare equal.
pub fn normalize_value(raw: &str) -> String {
    let whitespace = Regex::new(r"\s+").unwrap();
    let unit_gap = Regex::new(r"(\d) ([^\s\d])").unwrap();

    let collapsed = whitespace.replace_all(raw.trim(), " ").to_lowercase();
    unit_gap.replace_all(&collapsed, "${1}${2}").to_string()
}

/// Run the extraction service over every successfully fetched source
/// and collect candidates. Sources whose extraction fails contribute
/// zero candidates.
pub async fn extract_candidates(
    sources: &[FetchedSource],
    schema: &[PropertyDefinition],
    hint: &ProductHint,
    extractor: &dyn PropertyExtractor,
) -> Vec<Candidate> {
    let known: HashSet<&str> = schema.iter().map(|d| d.name.as_str()).collect();
    let mut candidates = Vec::new();

    for source in sources.iter().filter(|s| s.success) {
        let fields = match extractor.extract(&source.content, schema, hint).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(
                    url = %source.url,
                    error = %e,
                    "extraction failed, source contributes no candidates"
                );
                continue;
            }
        };

        for field in fields {
            if field.is_not_found() {
                continue;
            }
            if !known.contains(field.property.as_str()) {
                debug!(property = %field.property, "extractor returned unknown property, ignoring");
                continue;
            }

            let raw_value = field.value.trim().to_string();
            candidates.push(Candidate {
                property_name: field.property,
                normalized_value: normalize_value(&raw_value),
                raw_value,
                source_url: source.url.clone(),
                source_title: source.title.clone(),
                arrival_seq: source.arrival_seq,
            });
        }
    }

    debug!(
        sources = sources.iter().filter(|s| s.success).count(),
        candidates = candidates.len(),
        "extraction settled"
    );

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedExtractor;
    use crate::types::FetchMethod;

    fn source(url: &str, content: &str, seq: u64) -> FetchedSource {
        FetchedSource::fetched(url, None, content.to_string(), FetchMethod::FastStatic, seq, 100)
    }

    fn schema() -> Vec<PropertyDefinition> {
        vec![
            PropertyDefinition::new("Gewicht"),
            PropertyDefinition::new("Farbe"),
        ]
    }

    fn hint() -> ProductHint {
        ProductHint {
            product_name: "Ofen Modell X".to_string(),
            article_number: None,
        }
    }

    #[test]
    fn test_normalize_collapses_unit_gap() {
        assert_eq!(normalize_value("12 kg"), "12kg");
        assert_eq!(normalize_value("12kg"), "12kg");
        assert_eq!(normalize_value("  12   KG  "), "12kg");
        assert_eq!(normalize_value("15 kg"), "15kg");
        assert_ne!(normalize_value("12 kg"), normalize_value("15 kg"));
    }

    #[test]
    fn test_normalize_preserves_word_boundaries() {
        assert_eq!(normalize_value("Anthrazit Grau"), "anthrazit grau");
        assert_ne!(normalize_value("Anthrazit Grau"), normalize_value("Anthrazitgrau"));
    }

    #[test]
    fn test_not_found_marker() {
        assert!(ExtractedField::new("Gewicht", "not found").is_not_found());
        assert!(ExtractedField::new("Gewicht", "Not Found").is_not_found());
        assert!(ExtractedField::new("Gewicht", "   ").is_not_found());
        assert!(!ExtractedField::new("Gewicht", "12 kg").is_not_found());
    }

    #[tokio::test]
    async fn test_candidates_tagged_with_source() {
        let extractor = ScriptedExtractor::new()
            .with_response("page one", vec![("Gewicht", "12 kg"), ("Farbe", "not found")]);
        let sources = vec![source("https://a.example/p", "page one text", 0)];

        let candidates = extract_candidates(&sources, &schema(), &hint(), &extractor).await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].property_name, "Gewicht");
        assert_eq!(candidates[0].raw_value, "12 kg");
        assert_eq!(candidates[0].normalized_value, "12kg");
        assert_eq!(candidates[0].source_url, "https://a.example/p");
        assert_eq!(candidates[0].arrival_seq, 0);
    }

    #[tokio::test]
    async fn test_unknown_properties_dropped() {
        let extractor = ScriptedExtractor::new()
            .with_response("page", vec![("Gewicht", "12 kg"), ("Preis", "499 EUR")]);
        let sources = vec![source("https://a.example/p", "page text", 0)];

        let candidates = extract_candidates(&sources, &schema(), &hint(), &extractor).await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].property_name, "Gewicht");
    }

    #[tokio::test]
    async fn test_failed_sources_skipped() {
        let extractor = ScriptedExtractor::new().with_response("good", vec![("Gewicht", "12 kg")]);
        let failed = FetchedSource::failed("https://down.example/p", None, "timeout", 0, 5000);
        let sources = vec![failed, source("https://up.example/p", "good text", 1)];

        let candidates = extract_candidates(&sources, &schema(), &hint(), &extractor).await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source_url, "https://up.example/p");
    }

    #[tokio::test]
    async fn test_service_failure_is_absorbed() {
        let extractor = ScriptedExtractor::failing();
        let sources = vec![source("https://a.example/p", "text", 0)];

        let candidates = extract_candidates(&sources, &schema(), &hint(), &extractor).await;

        assert!(candidates.is_empty());
    }
}
