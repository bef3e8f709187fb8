//! The source fetcher: policy filtering plus bounded-concurrency,
//! fail-soft fetching.
//!
//! One worker per URL, gated by a semaphore. A URL's total failure
//! never cancels or delays its siblings; the result list settles when
//! every worker has. Output order is not the input order — each
//! fetched source carries its arrival sequence number instead.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditSink, NoopAuditSink};
use crate::config::DEFAULT_SOURCE_CONCURRENCY;
use crate::policy::DomainPolicy;
use crate::types::{CandidateSource, FetchedSource};

use super::FetchLadder;

pub struct SourceFetcher {
    ladder: Arc<FetchLadder>,
    policy: Arc<DomainPolicy>,
    audit: Arc<dyn AuditSink>,
    concurrency: usize,
}

impl SourceFetcher {
    pub fn new(ladder: Arc<FetchLadder>, policy: Arc<DomainPolicy>) -> Self {
        Self {
            ladder,
            policy,
            audit: Arc::new(NoopAuditSink),
            concurrency: DEFAULT_SOURCE_CONCURRENCY,
        }
    }

    /// Set the audit sink.
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Set the worker-pool size.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fetch every admissible candidate. Excluded-domain URLs are
    /// dropped before any network I/O; duplicate URLs are fetched
    /// once. Cancelling the token aborts in-flight ladders for this
    /// call only.
    pub async fn fetch_all(
        &self,
        sources: Vec<CandidateSource>,
        cancel: &CancellationToken,
    ) -> Vec<FetchedSource> {
        let requested = sources.len();
        let mut seen: HashSet<String> = HashSet::new();
        let mut admitted: Vec<CandidateSource> = Vec::new();

        for source in sources {
            if !self.policy.is_allowed(&source.url) {
                debug!(url = %source.url, "excluded by domain policy");
                continue;
            }
            if !seen.insert(source.url.clone()) {
                debug!(url = %source.url, "duplicate candidate, fetching once");
                continue;
            }
            admitted.push(source);
        }

        info!(
            requested = requested,
            admitted = admitted.len(),
            concurrency = self.concurrency,
            "starting source fetch"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let arrival = Arc::new(AtomicU64::new(0));
        let mut handles = Vec::with_capacity(admitted.len());

        for source in admitted {
            let ladder = Arc::clone(&self.ladder);
            let semaphore = Arc::clone(&semaphore);
            let arrival = Arc::clone(&arrival);
            let audit = Arc::clone(&self.audit);
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return None,
                };

                let started = Instant::now();
                let outcome = ladder.fetch(&source.url, &cancel).await;
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let arrival_seq = arrival.fetch_add(1, Ordering::SeqCst);

                let fetched = match outcome {
                    Ok((attempt, method)) => FetchedSource::fetched(
                        source.url,
                        attempt.title.or(source.title),
                        attempt.content,
                        method,
                        arrival_seq,
                        elapsed_ms,
                    ),
                    Err(e) => {
                        warn!(url = %source.url, error = %e, "all fetch strategies failed");
                        FetchedSource::failed(source.url, source.title, e.to_string(), arrival_seq, elapsed_ms)
                    }
                };

                audit.record(AuditEvent::SourceFetched {
                    url: fetched.url.clone(),
                    method: fetched.method,
                    content_length: fetched.content_length,
                    content_hash: fetched.content_hash.clone(),
                    success: fetched.success,
                    elapsed_ms,
                });

                Some(fetched)
            }));
        }

        let mut fetched = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Some(source)) => fetched.push(source),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "fetch worker panicked"),
            }
        }

        info!(
            fetched = fetched.len(),
            succeeded = fetched.iter().filter(|s| s.success).count(),
            "source fetch settled"
        );

        fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DomainEntry;
    use crate::testing::{CannedFailure, StaticStrategy};
    use crate::types::FetchMethod;

    fn candidate(url: &str) -> CandidateSource {
        CandidateSource::new(url)
    }

    fn fetcher_for(strategy: StaticStrategy, policy: DomainPolicy) -> SourceFetcher {
        let ladder = Arc::new(FetchLadder::new(vec![Arc::new(strategy)]));
        SourceFetcher::new(ladder, Arc::new(policy))
    }

    #[tokio::test]
    async fn test_excluded_domain_never_fetched() {
        let content = "x".repeat(1500);
        let strategy = StaticStrategy::serving(
            FetchMethod::FastStatic,
            &[
                ("https://ok.example.com/p", content.as_str()),
                ("https://excluded.example.com/p", content.as_str()),
            ],
        );
        let attempts = strategy.attempts_handle();
        let policy = DomainPolicy::from_entries(&[DomainEntry::excluded("excluded.example.com")]);
        let fetcher = fetcher_for(strategy, policy);

        let fetched = fetcher
            .fetch_all(
                vec![
                    candidate("https://ok.example.com/p"),
                    candidate("https://excluded.example.com/p"),
                ],
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].url, "https://ok.example.com/p");
        assert!(!attempts
            .lock()
            .unwrap()
            .iter()
            .any(|u| u.contains("excluded")));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_cancel_siblings() {
        let content = "x".repeat(1500);
        let strategy = StaticStrategy::serving(
            FetchMethod::FastStatic,
            &[("https://up.example.com/p", content.as_str())],
        );
        let fetcher = fetcher_for(strategy, DomainPolicy::empty());

        let fetched = fetcher
            .fetch_all(
                vec![
                    candidate("https://down.example.com/p"),
                    candidate("https://up.example.com/p"),
                ],
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(fetched.len(), 2);
        let up = fetched.iter().find(|s| s.url.contains("up")).unwrap();
        let down = fetched.iter().find(|s| s.url.contains("down")).unwrap();
        assert!(up.success);
        assert!(!down.success);
        assert!(down.error.is_some());
        assert_eq!(down.method, FetchMethod::None);
    }

    #[tokio::test]
    async fn test_duplicate_urls_fetched_once() {
        let content = "x".repeat(1500);
        let strategy = StaticStrategy::serving(
            FetchMethod::FastStatic,
            &[("https://a.example.com/p", content.as_str())],
        );
        let attempts = strategy.attempts_handle();
        let fetcher = fetcher_for(strategy, DomainPolicy::empty());

        let fetched = fetcher
            .fetch_all(
                vec![
                    candidate("https://a.example.com/p"),
                    candidate("https://a.example.com/p"),
                ],
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(fetched.len(), 1);
        assert_eq!(attempts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_arrival_sequence_is_dense_and_unique() {
        let content = "x".repeat(1500);
        let pages: Vec<(String, String)> = (0..8)
            .map(|i| (format!("https://s{}.example.com/p", i), content.clone()))
            .collect();
        let refs: Vec<(&str, &str)> = pages
            .iter()
            .map(|(u, c)| (u.as_str(), c.as_str()))
            .collect();
        let strategy = StaticStrategy::serving(FetchMethod::FastStatic, &refs);
        let fetcher = fetcher_for(strategy, DomainPolicy::empty()).with_concurrency(3);

        let fetched = fetcher
            .fetch_all(
                pages.iter().map(|(u, _)| candidate(u)).collect(),
                &CancellationToken::new(),
            )
            .await;

        let mut seqs: Vec<u64> = fetched.iter().map(|s| s.arrival_seq).collect();
        seqs.sort_unstable();
        assert_eq!(seqs, (0..8).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_audit_record_per_fetched_source() {
        let content = "x".repeat(1500);
        let strategy = StaticStrategy::serving(
            FetchMethod::FastStatic,
            &[("https://a.example.com/p", content.as_str())],
        );
        let audit = Arc::new(crate::audit::MemoryAuditSink::new());
        let fetcher =
            fetcher_for(strategy, DomainPolicy::empty()).with_audit(audit.clone());

        fetcher
            .fetch_all(
                vec![
                    candidate("https://a.example.com/p"),
                    candidate("https://down.example.com/p"),
                ],
                &CancellationToken::new(),
            )
            .await;

        let events = audit.fetch_events();
        assert_eq!(events.len(), 2);
        let ok = events.iter().any(|e| matches!(
            e,
            AuditEvent::SourceFetched { url, success: true, content_length, .. }
                if url.contains("a.example") && *content_length == 1500
        ));
        assert!(ok);
        assert!(events.iter().any(|e| matches!(
            e,
            AuditEvent::SourceFetched { url, success: false, .. } if url.contains("down.example")
        )));
    }

    #[tokio::test]
    async fn test_failed_source_retains_last_error() {
        let strategy = StaticStrategy::failing(FetchMethod::FastStatic, CannedFailure::Http("tls handshake".into()));
        let fetcher = fetcher_for(strategy, DomainPolicy::empty());

        let fetched = fetcher
            .fetch_all(vec![candidate("https://bad.example.com/p")], &CancellationToken::new())
            .await;

        assert_eq!(fetched.len(), 1);
        assert!(fetched[0].error.as_deref().unwrap_or("").contains("tls handshake"));
    }
}
