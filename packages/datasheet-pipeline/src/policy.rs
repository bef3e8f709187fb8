//! Domain policy: trusted and excluded hostname lists.
//!
//! The policy is an immutable snapshot built once per pipeline run
//! from externally maintained domain lists, shared read-only across
//! all workers. It never refreshes itself mid-run.

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

/// Whether a domain entry prioritizes or blocks its hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainKind {
    Trusted,
    Excluded,
}

/// One externally maintained domain rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEntry {
    /// Hostname, e.g. "hersteller.de"
    pub hostname: String,

    pub kind: DomainKind,

    /// Inactive entries are ignored
    pub active: bool,
}

impl DomainEntry {
    /// Create an active trusted entry.
    pub fn trusted(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            kind: DomainKind::Trusted,
            active: true,
        }
    }

    /// Create an active excluded entry.
    pub fn excluded(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            kind: DomainKind::Excluded,
            active: true,
        }
    }

    /// Deactivate the entry.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Immutable lookup over the active trusted and excluded domain sets.
///
/// Trusted entries are ranked by list position: lower rank is more
/// trusted. A hostname appearing in both sets is excluded (fail
/// closed); the conflict is resolved here even though upstream is
/// supposed to reject it.
#[derive(Debug, Clone, Default)]
pub struct DomainPolicy {
    trusted: Vec<String>,
    excluded: Vec<String>,
}

impl DomainPolicy {
    /// Policy with no rules: everything allowed, nothing prioritized.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from domain entries. Inactive entries are
    /// dropped; hostnames are normalized to lowercase without a
    /// leading `www.`.
    pub fn from_entries(entries: &[DomainEntry]) -> Self {
        let mut trusted = Vec::new();
        let mut excluded = Vec::new();

        for entry in entries.iter().filter(|e| e.active) {
            let hostname = normalize_hostname(&entry.hostname);
            if hostname.is_empty() {
                continue;
            }
            match entry.kind {
                DomainKind::Trusted => {
                    if !trusted.contains(&hostname) {
                        trusted.push(hostname);
                    }
                }
                DomainKind::Excluded => {
                    if !excluded.contains(&hostname) {
                        excluded.push(hostname);
                    }
                }
            }
        }

        // Exclusion wins over trust for the same hostname
        let conflicted: Vec<String> = trusted
            .iter()
            .filter(|h| excluded.contains(h))
            .cloned()
            .collect();
        for hostname in conflicted {
            warn!(hostname = %hostname, "domain listed as both trusted and excluded, excluding");
            trusted.retain(|h| h != &hostname);
        }

        Self { trusted, excluded }
    }

    /// False iff the URL's host, or any parent domain of it, matches
    /// an active excluded entry. Malformed URLs match nothing and are
    /// allowed through (they fail later, at fetch time).
    pub fn is_allowed(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return true;
        };
        !self
            .excluded
            .iter()
            .any(|excluded| host_matches(&host, excluded))
    }

    /// Rank of the URL's host in the trusted list (lower is more
    /// trusted), by hostname equality ignoring a leading `www.`.
    /// `None` for unranked or malformed URLs.
    pub fn priority_rank(&self, url: &str) -> Option<usize> {
        let host = host_of(url)?;
        self.trusted.iter().position(|trusted| trusted == &host)
    }

    /// Number of active trusted entries.
    pub fn trusted_len(&self) -> usize {
        self.trusted.len()
    }

    /// Number of active excluded entries.
    pub fn excluded_len(&self) -> usize {
        self.excluded.len()
    }
}

fn normalize_hostname(hostname: &str) -> String {
    let hostname = hostname.trim().to_lowercase();
    hostname
        .strip_prefix("www.")
        .unwrap_or(&hostname)
        .to_string()
}

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(normalize_hostname(host))
}

/// Suffix match on dot boundaries: `shop.example.com` matches the
/// entry `example.com`, `notexample.com` does not.
fn host_matches(host: &str, entry: &str) -> bool {
    host == entry || host.ends_with(&format!(".{}", entry))
}
