//! Pipeline input and terminal output types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::property::PropertyResult;
use super::source::CandidateSource;

/// Input for one product: identity hints plus the externally supplied
/// candidate URLs. The pipeline does not discover links on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductQuery {
    /// Product name, passed to the extraction service as a hint
    pub product_name: String,

    /// Manufacturer article number if known
    pub article_number: Option<String>,

    /// Candidate URLs to fetch for this product
    pub candidates: Vec<CandidateSource>,
}

impl ProductQuery {
    /// Create a query for a named product.
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            article_number: None,
            candidates: Vec::new(),
        }
    }

    /// Set the article number.
    pub fn with_article_number(mut self, article_number: impl Into<String>) -> Self {
        self.article_number = Some(article_number.into());
        self
    }

    /// Add a candidate URL.
    pub fn with_candidate(mut self, candidate: CandidateSource) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Add multiple candidate URLs.
    pub fn with_candidates(mut self, candidates: impl IntoIterator<Item = CandidateSource>) -> Self {
        self.candidates.extend(candidates);
        self
    }
}

/// Reconciled datasheet for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResult {
    /// Identifier of this result
    pub id: Uuid,

    /// Echoed from the query
    pub article_number: Option<String>,

    /// Echoed from the query
    pub product_name: String,

    /// One entry per requested property, plus the `_sources` meta
    /// entry. Display order comes from the schema's order_index, not
    /// from this map.
    pub properties: HashMap<String, PropertyResult>,
}

/// Terminal batch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// The batch ran to completion (individual products may still be
    /// empty)
    Completed,
    /// No source could be fetched for any product in the batch
    NoSources,
}

/// Terminal output of the pipeline. Ownership passes to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub products: Vec<ProductResult>,
    pub search_status: SearchStatus,
    pub status_message: String,
}

/// Per-product progress through the pipeline, surfaced via audit
/// events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Pending,
    Fetching,
    Extracting,
    Reconciling,
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = ProductQuery::new("Ofen Modell X")
            .with_article_number("OFX-100")
            .with_candidate(CandidateSource::new("https://shop.example.com/ofx"))
            .with_candidates(vec![CandidateSource::new("https://datenblatt.example.org/ofx")]);

        assert_eq!(query.product_name, "Ofen Modell X");
        assert_eq!(query.article_number.as_deref(), Some("OFX-100"));
        assert_eq!(query.candidates.len(), 2);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&SearchStatus::NoSources).unwrap(),
            "\"no_sources\""
        );
        assert_eq!(
            serde_json::to_string(&PipelinePhase::Reconciling).unwrap(),
            "\"reconciling\""
        );
    }
}
