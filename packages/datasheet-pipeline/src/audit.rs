//! Best-effort audit event emission.
//!
//! The pipeline reports what it did — per-source fetch outcomes and
//! per-product phase transitions — through a sink it never waits on
//! and that cannot fail by signature. Sink implementations decide
//! what to do with the records; the pipeline does not depend on any
//! of them being available.

use serde::Serialize;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::types::{FetchMethod, PipelinePhase};

/// One audit record emitted at a pipeline checkpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// The ladder settled for one URL.
    SourceFetched {
        url: String,
        method: FetchMethod,
        content_length: usize,
        content_hash: String,
        success: bool,
        elapsed_ms: u64,
    },
    /// A product pipeline moved to a new phase.
    PhaseChanged {
        product: String,
        phase: PipelinePhase,
    },
}

/// Fire-and-forget audit sink. `record` must not block and must not
/// fail; implementations swallow their own problems.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Sink that drops everything.
#[derive(Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

/// Sink that forwards records as structured tracing events.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        match event {
            AuditEvent::SourceFetched {
                url,
                method,
                content_length,
                content_hash,
                success,
                elapsed_ms,
            } => {
                info!(
                    url = %url,
                    method = ?method,
                    content_length = content_length,
                    content_hash = %content_hash,
                    success = success,
                    elapsed_ms = elapsed_ms,
                    "source fetched"
                );
            }
            AuditEvent::PhaseChanged { product, phase } => {
                debug!(product = %product, phase = ?phase, "pipeline phase");
            }
        }
    }
}

/// Sink that keeps records in memory, for tests and inspection.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Recorded fetch events only.
    pub fn fetch_events(&self) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, AuditEvent::SourceFetched { .. }))
            .collect()
    }

    /// Phases recorded for one product, in order.
    pub fn phases_for(&self, product_name: &str) -> Vec<PipelinePhase> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AuditEvent::PhaseChanged { product, phase } if product == product_name => Some(phase),
                _ => None,
            })
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}
