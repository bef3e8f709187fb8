//! Multi-Source Datasheet Assembly Pipeline
//!
//! Builds technical-specification tables for physical products by
//! pulling candidate values from untrusted web sources and
//! reconciling disagreements into one trustworthy answer per
//! property.
//!
//! # Design Philosophy
//!
//! - Acquisition escalates, cheapest first: a four-rung strategy
//!   ladder from plain GET to headless rendering, early exit on the
//!   first success
//! - Consensus over trust: per-property answers come from the largest
//!   group of agreeing sources, with trusted domains only breaking
//!   ties
//! - Fail soft everywhere: a dead URL, a blocked site or a confused
//!   extraction call costs one source, never the search
//! - No shared mutable state: the domain policy is an immutable
//!   snapshot, every pipeline run owns its data exclusively
//!
//! # Usage
//!
//! ```rust,ignore
//! use datasheet_pipeline::{
//!     CandidateSource, DomainPolicy, FetchConfig, FetchLadder, OpenAiExtractor,
//!     Pipeline, ProductQuery, PropertyDefinition,
//! };
//! use std::sync::Arc;
//!
//! let ladder = Arc::new(FetchLadder::standard(&FetchConfig::default())?);
//! let extractor = Arc::new(OpenAiExtractor::from_env()?);
//! let pipeline = Pipeline::new(ladder, DomainPolicy::empty(), extractor);
//!
//! let schema = vec![
//!     PropertyDefinition::new("Gewicht").required(),
//!     PropertyDefinition::new("Farbe"),
//! ];
//! let query = ProductQuery::new("Ofen Modell X")
//!     .with_candidate(CandidateSource::new("https://shop.example.com/ofx"));
//!
//! let result = pipeline.run(query, &schema).await;
//! println!("{:?}", result.properties["Gewicht"]);
//! ```
//!
//! # Modules
//!
//! - [`policy`] - trusted/excluded domain snapshot
//! - [`fetch`] - strategy ladder and bounded-concurrency fetcher
//! - [`extract`] - extraction-service boundary and value normalization
//! - [`reconcile`] - cross-source consensus and confidence scoring
//! - [`pipeline`] - per-product and batch orchestration
//! - [`audit`] - fire-and-forget observability sink
//! - [`testing`] - canned mocks for the network-facing seams

pub mod audit;
pub mod config;
pub mod error;
pub mod extract;
pub mod extractors;
pub mod fetch;
pub mod pipeline;
pub mod policy;
pub mod reconcile;
pub mod testing;
pub mod types;

// Re-export core types at crate root
pub use audit::{AuditEvent, AuditSink, MemoryAuditSink, NoopAuditSink, TracingAuditSink};
pub use config::{FetchConfig, PipelineConfig};
pub use error::{ExtractError, FetchError, PipelineError};
pub use extract::{
    extract_candidates, normalize_value, ExtractedField, ProductHint, PropertyExtractor,
    NOT_FOUND_MARKER,
};
pub use extractors::OpenAiExtractor;
pub use fetch::{
    EnhancedStaticFetch, FastStaticFetch, FetchAttempt, FetchLadder, FetchStrategy, RenderedFetch,
    ScriptMiningFetch, SourceFetcher,
};
pub use pipeline::Pipeline;
pub use policy::{DomainEntry, DomainKind, DomainPolicy};
pub use reconcile::{confidence_for, reconcile, FETCHED_SOURCES_PROPERTY};
pub use types::{
    Candidate, CandidateSource, FetchMethod, FetchedSource, PipelinePhase, ProductQuery,
    ProductResult, PropertyDefinition, PropertyResult, SearchResponse, SearchStatus, SourceRef,
};
