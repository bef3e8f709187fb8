//! Property schema and reconciliation result types.

use serde::{Deserialize, Serialize};

/// One row of the requested datasheet table, supplied by the external
/// property-schema collaborator. Read-only input to extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Property name as it appears in the table (e.g. "Gewicht")
    pub name: String,

    /// Free-text description to steer extraction
    pub description: Option<String>,

    /// Expected value format hint (e.g. "number + unit")
    pub expected_format: Option<String>,

    /// Display order in the table
    pub order_index: i32,

    /// Whether the table requires a value for this property
    pub is_required: bool,
}

impl PropertyDefinition {
    /// Create a definition with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            expected_format: None,
            order_index: 0,
            is_required: false,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the expected format hint.
    pub fn with_expected_format(mut self, format: impl Into<String>) -> Self {
        self.expected_format = Some(format.into());
        self
    }

    /// Set the display order.
    pub fn with_order_index(mut self, index: i32) -> Self {
        self.order_index = index;
        self
    }

    /// Mark the property as required.
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }
}

/// One source's extracted value for one property, before
/// reconciliation. Produced by the extraction adapter, consumed only
/// by the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Property this value belongs to
    pub property_name: String,

    /// Value as extracted, original casing preserved
    pub raw_value: String,

    /// Comparison key: trimmed, case-folded, unit spacing collapsed
    pub normalized_value: String,

    /// URL of the contributing source
    pub source_url: String,

    /// Title of the contributing source
    pub source_title: Option<String>,

    /// Arrival sequence of the contributing source
    pub arrival_seq: u64,
}

/// A `{url, title}` pair referencing a contributing source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub url: String,
    pub title: Option<String>,
}

/// Reconciled answer for one property: the chosen value, its
/// confidence, and the sources that agree on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyResult {
    /// Property name
    pub name: String,

    /// Chosen value (raw casing of the representative candidate);
    /// empty when no source produced a value
    pub value: String,

    /// Confidence score, 0-100
    pub confidence: u8,

    /// Whether enough sources agree on the chosen value
    pub is_consistent: bool,

    /// Number of sources whose normalized value matches the chosen one
    pub consistency_count: usize,

    /// Deduplicated references to the agreeing sources only
    pub sources: Vec<SourceRef>,
}

impl PropertyResult {
    /// Result for a property no source answered.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            confidence: 0,
            is_consistent: false,
            consistency_count: 0,
            sources: Vec::new(),
        }
    }
}
