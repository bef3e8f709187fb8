//! Pipeline orchestrator: drive products through fetch → extract →
//! reconcile.
//!
//! A product search always returns a response. Per-source and
//! per-property failures have already been absorbed by the time
//! results are assembled; a product with zero fetched sources still
//! completes, with every property empty at confidence zero. In batch
//! mode products run under an outer concurrency bound so one slow
//! product cannot starve the rest, and cancelling the batch token
//! propagates to every in-flight fetch.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditSink, NoopAuditSink};
use crate::config::PipelineConfig;
use crate::extract::{extract_candidates, ProductHint, PropertyExtractor};
use crate::fetch::{FetchLadder, SourceFetcher};
use crate::policy::DomainPolicy;
use crate::reconcile::{reconcile, FETCHED_SOURCES_PROPERTY};
use crate::types::{
    PipelinePhase, ProductQuery, ProductResult, PropertyDefinition, SearchResponse, SearchStatus,
};

pub struct Pipeline {
    fetcher: SourceFetcher,
    extractor: Arc<dyn PropertyExtractor>,
    policy: Arc<DomainPolicy>,
    audit: Arc<dyn AuditSink>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Assemble a pipeline from its collaborators. The domain policy
    /// snapshot is taken here and shared read-only across all
    /// workers for the lifetime of the pipeline.
    pub fn new(
        ladder: Arc<FetchLadder>,
        policy: DomainPolicy,
        extractor: Arc<dyn PropertyExtractor>,
    ) -> Self {
        let policy = Arc::new(policy);
        let config = PipelineConfig::default();
        let fetcher = SourceFetcher::new(ladder, Arc::clone(&policy))
            .with_concurrency(config.source_concurrency);
        Self {
            fetcher,
            extractor,
            policy,
            audit: Arc::new(NoopAuditSink),
            config,
        }
    }

    /// Set the audit sink.
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.fetcher = self.fetcher.with_audit(Arc::clone(&audit));
        self.audit = audit;
        self
    }

    /// Set the pipeline configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.fetcher = self.fetcher.with_concurrency(config.source_concurrency);
        self.config = config;
        self
    }

    /// Run one product through the pipeline.
    pub async fn run(&self, query: ProductQuery, schema: &[PropertyDefinition]) -> ProductResult {
        self.run_with_cancel(query, schema, CancellationToken::new())
            .await
    }

    /// Run one product, abortable through the token. Cancellation
    /// stops in-flight fetches for this product only.
    pub async fn run_with_cancel(
        &self,
        query: ProductQuery,
        schema: &[PropertyDefinition],
        cancel: CancellationToken,
    ) -> ProductResult {
        let ProductQuery {
            product_name,
            article_number,
            candidates,
        } = query;

        self.phase(&product_name, PipelinePhase::Pending);

        self.phase(&product_name, PipelinePhase::Fetching);
        let fetched = self.fetcher.fetch_all(candidates, &cancel).await;
        let succeeded = fetched.iter().filter(|s| s.success).count();

        self.phase(&product_name, PipelinePhase::Extracting);
        let extracted = if succeeded == 0 {
            warn!(product = %product_name, "no sources fetched, completing with empty results");
            Vec::new()
        } else {
            let hint = ProductHint {
                product_name: product_name.clone(),
                article_number: article_number.clone(),
            };
            extract_candidates(&fetched, schema, &hint, self.extractor.as_ref()).await
        };

        self.phase(&product_name, PipelinePhase::Reconciling);
        let properties = reconcile(
            &extracted,
            schema,
            &fetched,
            self.config.min_consistent_sources,
            &self.policy,
        );

        self.phase(&product_name, PipelinePhase::Complete);
        info!(
            product = %product_name,
            sources = succeeded,
            candidates = extracted.len(),
            properties = schema.len(),
            "product pipeline complete"
        );

        ProductResult {
            id: Uuid::now_v7(),
            article_number,
            product_name,
            properties,
        }
    }

    /// Run a batch of products under the outer concurrency bound.
    pub async fn run_batch(
        &self,
        queries: Vec<ProductQuery>,
        schema: &[PropertyDefinition],
    ) -> SearchResponse {
        self.run_batch_with_cancel(queries, schema, CancellationToken::new())
            .await
    }

    /// Batch run, abortable through the token. Each product gets a
    /// child token, so cancelling one product's pipeline externally
    /// does not affect its siblings, while cancelling the batch
    /// token stops everything.
    pub async fn run_batch_with_cancel(
        &self,
        queries: Vec<ProductQuery>,
        schema: &[PropertyDefinition],
        cancel: CancellationToken,
    ) -> SearchResponse {
        let total = queries.len();
        info!(
            products = total,
            concurrency = self.config.product_concurrency,
            "starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.product_concurrency));
        let runs = queries.into_iter().map(|query| {
            let semaphore = Arc::clone(&semaphore);
            let child = cancel.child_token();
            async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return None,
                };
                Some(self.run_with_cancel(query, schema, child).await)
            }
        });

        let products: Vec<ProductResult> = join_all(runs).await.into_iter().flatten().collect();

        let any_sources = products.iter().any(|p| {
            p.properties
                .get(FETCHED_SOURCES_PROPERTY)
                .map(|meta| meta.consistency_count > 0)
                .unwrap_or(false)
        });

        let (search_status, status_message) = if any_sources {
            (
                SearchStatus::Completed,
                format!("reconciled {} of {} product(s)", products.len(), total),
            )
        } else {
            (
                SearchStatus::NoSources,
                "no sources could be fetched for any product".to_string(),
            )
        };

        SearchResponse {
            products,
            search_status,
            status_message,
        }
    }

    fn phase(&self, product: &str, phase: PipelinePhase) {
        self.audit.record(AuditEvent::PhaseChanged {
            product: product.to_string(),
            phase,
        });
    }
}
