//! Reconciliation: collapse per-source candidates into one ranked
//! answer per property.
//!
//! A pure function of the candidate set, the schema, the fetch
//! arrival order and the domain policy — no clock, no randomness.
//! Grouping is by exact normalized value; there is no fuzzy matching
//! here.

use std::collections::HashMap;
use tracing::debug;

use crate::policy::DomainPolicy;
use crate::types::{Candidate, FetchedSource, PropertyDefinition, PropertyResult, SourceRef};

/// Key of the always-present meta entry listing every successfully
/// fetched source for the product. Bookkeeping for provenance
/// display, not part of the consensus computation; the underscore
/// keeps it disjoint from schema property names.
pub const FETCHED_SOURCES_PROPERTY: &str = "_sources";

const CONFIDENCE_SINGLE: u8 = 60;
const CONFIDENCE_CORROBORATED: u8 = 80;
const CONFIDENCE_SATURATED: u8 = 100;

/// Confidence as a function of agreeing-source count, saturating at
/// three sources.
pub fn confidence_for(consistency_count: usize) -> u8 {
    match consistency_count {
        0 => 0,
        1 => CONFIDENCE_SINGLE,
        2 => CONFIDENCE_CORROBORATED,
        _ => CONFIDENCE_SATURATED,
    }
}

struct ValueGroup<'a> {
    normalized: &'a str,
    members: Vec<&'a Candidate>,
}

impl<'a> ValueGroup<'a> {
    /// Representative: the member that arrived first.
    fn representative(&self) -> &'a Candidate {
        self.members[0]
    }

    fn first_seq(&self) -> u64 {
        self.members[0].arrival_seq
    }

    fn best_rank(&self, policy: &DomainPolicy) -> usize {
        self.members
            .iter()
            .map(|c| policy.priority_rank(&c.source_url).unwrap_or(usize::MAX))
            .min()
            .unwrap_or(usize::MAX)
    }
}

/// Reconcile all candidates for one product into per-property
/// results, keyed by property name. Every schema property gets an
/// entry; the `_sources` meta entry is always added on top.
pub fn reconcile(
    candidates: &[Candidate],
    schema: &[PropertyDefinition],
    fetched: &[FetchedSource],
    min_consistent_sources: usize,
    policy: &DomainPolicy,
) -> HashMap<String, PropertyResult> {
    let mut results = HashMap::with_capacity(schema.len() + 1);

    for definition in schema {
        let result = reconcile_property(&definition.name, candidates, min_consistent_sources, policy);
        results.insert(definition.name.clone(), result);
    }

    results.insert(FETCHED_SOURCES_PROPERTY.to_string(), meta_entry(fetched));
    results
}

fn reconcile_property(
    name: &str,
    candidates: &[Candidate],
    min_consistent_sources: usize,
    policy: &DomainPolicy,
) -> PropertyResult {
    let mut of_property: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.property_name == name)
        .collect();
    if of_property.is_empty() {
        return PropertyResult::empty(name);
    }

    // Arrival order is the stable base order for everything below
    of_property.sort_by_key(|c| c.arrival_seq);

    let mut groups: Vec<ValueGroup> = Vec::new();
    for candidate in of_property {
        match groups
            .iter_mut()
            .find(|g| g.normalized == candidate.normalized_value)
        {
            Some(group) => group.members.push(candidate),
            None => groups.push(ValueGroup {
                normalized: &candidate.normalized_value,
                members: vec![candidate],
            }),
        }
    }

    // Largest group wins; ties broken by trusted-domain rank, then
    // representative raw-value length, then earliest arrival
    groups.sort_by(|a, b| {
        b.members
            .len()
            .cmp(&a.members.len())
            .then_with(|| a.best_rank(policy).cmp(&b.best_rank(policy)))
            .then_with(|| {
                b.representative()
                    .raw_value
                    .chars()
                    .count()
                    .cmp(&a.representative().raw_value.chars().count())
            })
            .then_with(|| a.first_seq().cmp(&b.first_seq()))
    });
    let best = &groups[0];

    let mut sources: Vec<SourceRef> = Vec::new();
    for member in &best.members {
        if !sources.iter().any(|s| s.url == member.source_url) {
            sources.push(SourceRef {
                url: member.source_url.clone(),
                title: member.source_title.clone(),
            });
        }
    }

    let consistency_count = best.members.len();
    let result = PropertyResult {
        name: name.to_string(),
        value: best.representative().raw_value.clone(),
        confidence: confidence_for(consistency_count),
        is_consistent: consistency_count >= min_consistent_sources,
        consistency_count,
        sources,
    };

    debug!(
        property = %name,
        value = %result.value,
        consistency_count = result.consistency_count,
        confidence = result.confidence,
        groups = groups.len(),
        "property reconciled"
    );

    result
}

/// Provenance bookkeeping: every successfully fetched source for the
/// product, in arrival order, whether or not it backed a winning
/// value.
fn meta_entry(fetched: &[FetchedSource]) -> PropertyResult {
    let mut succeeded: Vec<&FetchedSource> = fetched.iter().filter(|s| s.success).collect();
    succeeded.sort_by_key(|s| s.arrival_seq);

    let mut sources: Vec<SourceRef> = Vec::new();
    for source in succeeded {
        if !sources.iter().any(|s| s.url == source.url) {
            sources.push(SourceRef {
                url: source.url.clone(),
                title: source.title.clone(),
            });
        }
    }

    PropertyResult {
        name: FETCHED_SOURCES_PROPERTY.to_string(),
        value: String::new(),
        confidence: 0,
        is_consistent: false,
        consistency_count: sources.len(),
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::normalize_value;
    use crate::policy::DomainEntry;
    use crate::types::FetchMethod;
    use proptest::prelude::*;

    fn candidate(property: &str, raw: &str, url: &str, seq: u64) -> Candidate {
        Candidate {
            property_name: property.to_string(),
            raw_value: raw.to_string(),
            normalized_value: normalize_value(raw),
            source_url: url.to_string(),
            source_title: None,
            arrival_seq: seq,
        }
    }

    fn fetched_ok(url: &str, seq: u64) -> FetchedSource {
        FetchedSource::fetched(url, None, "content".to_string(), FetchMethod::FastStatic, seq, 50)
    }

    fn schema(names: &[&str]) -> Vec<PropertyDefinition> {
        names.iter().map(|n| PropertyDefinition::new(*n)).collect()
    }

    #[test]
    fn test_majority_value_wins() {
        // Three sources: "12 kg", "12kg", "15 kg" — the two that
        // normalize equal form the winning group
        let candidates = vec![
            candidate("Gewicht", "12 kg", "https://a.example/p", 0),
            candidate("Gewicht", "12kg", "https://b.example/p", 1),
            candidate("Gewicht", "15 kg", "https://c.example/p", 2),
        ];
        let fetched = vec![
            fetched_ok("https://a.example/p", 0),
            fetched_ok("https://b.example/p", 1),
            fetched_ok("https://c.example/p", 2),
        ];

        let results = reconcile(&candidates, &schema(&["Gewicht"]), &fetched, 1, &DomainPolicy::empty());
        let gewicht = &results["Gewicht"];

        assert_eq!(normalize_value(&gewicht.value), "12kg");
        assert_eq!(gewicht.consistency_count, 2);
        assert_eq!(gewicht.confidence, 80);
        assert!(gewicht.is_consistent);
        assert_eq!(gewicht.sources.len(), 2);
        assert!(!gewicht.sources.iter().any(|s| s.url.contains("c.example")));
    }

    #[test]
    fn test_no_candidates_yields_empty_result() {
        let results = reconcile(&[], &schema(&["Farbe"]), &[], 1, &DomainPolicy::empty());
        let farbe = &results["Farbe"];

        assert_eq!(farbe.value, "");
        assert_eq!(farbe.confidence, 0);
        assert!(!farbe.is_consistent);
        assert!(farbe.sources.is_empty());
    }

    #[test]
    fn test_confidence_saturates_at_three() {
        assert_eq!(confidence_for(0), 0);
        assert_eq!(confidence_for(1), 60);
        assert_eq!(confidence_for(2), 80);
        assert_eq!(confidence_for(3), 100);
        assert_eq!(confidence_for(7), 100);
    }

    #[test]
    fn test_trusted_domain_breaks_ties() {
        let policy = DomainPolicy::from_entries(&[DomainEntry::trusted("hersteller.de")]);
        // Two groups of one; the trusted source's value must win even
        // though it arrived later and is shorter
        let candidates = vec![
            candidate("Leistung", "8,5 kW max", "https://shop.example.com/p", 0),
            candidate("Leistung", "8 kW", "https://hersteller.de/p", 1),
        ];
        let fetched = vec![
            fetched_ok("https://shop.example.com/p", 0),
            fetched_ok("https://hersteller.de/p", 1),
        ];

        let results = reconcile(&candidates, &schema(&["Leistung"]), &fetched, 1, &policy);
        assert_eq!(results["Leistung"].value, "8 kW");
    }

    #[test]
    fn test_longer_raw_value_breaks_remaining_ties() {
        let candidates = vec![
            candidate("Material", "Stahl", "https://a.example/p", 0),
            candidate("Material", "Stahl, pulverbeschichtet", "https://b.example/p", 1),
        ];
        let fetched = vec![
            fetched_ok("https://a.example/p", 0),
            fetched_ok("https://b.example/p", 1),
        ];

        let results = reconcile(&candidates, &schema(&["Material"]), &fetched, 1, &DomainPolicy::empty());
        assert_eq!(results["Material"].value, "Stahl, pulverbeschichtet");
    }

    #[test]
    fn test_earliest_arrival_breaks_final_ties() {
        let candidates = vec![
            candidate("Farbe", "Grau", "https://b.example/p", 3),
            candidate("Farbe", "Rot.", "https://a.example/p", 1),
        ];
        let fetched = vec![
            fetched_ok("https://a.example/p", 1),
            fetched_ok("https://b.example/p", 3),
        ];

        // Same group size, no trusted domains, same raw length:
        // earliest arrival wins
        let results = reconcile(&candidates, &schema(&["Farbe"]), &fetched, 1, &DomainPolicy::empty());
        assert_eq!(results["Farbe"].value, "Rot.");
    }

    #[test]
    fn test_min_consistent_sources_gate() {
        let candidates = vec![candidate("Gewicht", "12 kg", "https://a.example/p", 0)];
        let fetched = vec![fetched_ok("https://a.example/p", 0)];

        let results = reconcile(&candidates, &schema(&["Gewicht"]), &fetched, 2, &DomainPolicy::empty());
        let gewicht = &results["Gewicht"];

        assert_eq!(gewicht.consistency_count, 1);
        assert_eq!(gewicht.confidence, 60);
        assert!(!gewicht.is_consistent);
    }

    #[test]
    fn test_meta_entry_lists_all_fetched_sources() {
        let candidates = vec![candidate("Gewicht", "12 kg", "https://a.example/p", 0)];
        let failed = FetchedSource::failed("https://down.example/p", None, "timeout", 2, 5000);
        let fetched = vec![
            fetched_ok("https://a.example/p", 0),
            fetched_ok("https://b.example/p", 1),
            failed,
        ];

        let results = reconcile(&candidates, &schema(&["Gewicht"]), &fetched, 1, &DomainPolicy::empty());
        let meta = &results[FETCHED_SOURCES_PROPERTY];

        // Both successful sources appear, including the one that
        // contributed no winning candidate; the failed one does not
        assert_eq!(meta.consistency_count, 2);
        assert_eq!(meta.sources.len(), 2);
        assert!(meta.sources.iter().any(|s| s.url.contains("b.example")));
        assert!(!meta.sources.iter().any(|s| s.url.contains("down.example")));
        assert_eq!(meta.confidence, 0);
    }

    #[test]
    fn test_winning_sources_all_agree() {
        // No result may cite a source outside its winning group
        let candidates = vec![
            candidate("Gewicht", "12 kg", "https://a.example/p", 0),
            candidate("Gewicht", "15 kg", "https://b.example/p", 1),
            candidate("Gewicht", "12kg", "https://c.example/p", 2),
        ];
        let fetched = vec![
            fetched_ok("https://a.example/p", 0),
            fetched_ok("https://b.example/p", 1),
            fetched_ok("https://c.example/p", 2),
        ];

        let results = reconcile(&candidates, &schema(&["Gewicht"]), &fetched, 1, &DomainPolicy::empty());
        let urls: Vec<&str> = results["Gewicht"].sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example/p", "https://c.example/p"]);
    }

    #[test]
    fn test_reconcile_is_deterministic_under_input_order() {
        let mut candidates = vec![
            candidate("Gewicht", "12 kg", "https://a.example/p", 0),
            candidate("Gewicht", "15 kg", "https://b.example/p", 1),
            candidate("Gewicht", "12kg", "https://c.example/p", 2),
            candidate("Farbe", "Anthrazit", "https://a.example/p", 0),
        ];
        let fetched = vec![
            fetched_ok("https://a.example/p", 0),
            fetched_ok("https://b.example/p", 1),
            fetched_ok("https://c.example/p", 2),
        ];
        let s = schema(&["Gewicht", "Farbe"]);

        let first = reconcile(&candidates, &s, &fetched, 1, &DomainPolicy::empty());
        candidates.reverse();
        let second = reconcile(&candidates, &s, &fetched, 1, &DomainPolicy::empty());

        assert_eq!(first["Gewicht"].value, second["Gewicht"].value);
        assert_eq!(first["Gewicht"].sources, second["Gewicht"].sources);
        assert_eq!(first["Farbe"].value, second["Farbe"].value);
    }

    proptest! {
        #[test]
        fn prop_confidence_is_monotonic(a in 0usize..10, b in 0usize..10) {
            if a <= b {
                prop_assert!(confidence_for(a) <= confidence_for(b));
            }
        }

        #[test]
        fn prop_reconcile_is_idempotent(values in proptest::collection::vec("[a-z0-9 ]{1,12}", 1..8)) {
            let candidates: Vec<Candidate> = values
                .iter()
                .enumerate()
                .map(|(i, v)| candidate("Gewicht", v, &format!("https://s{}.example/p", i), i as u64))
                .collect();
            let fetched: Vec<FetchedSource> = (0..values.len())
                .map(|i| fetched_ok(&format!("https://s{}.example/p", i), i as u64))
                .collect();
            let s = schema(&["Gewicht"]);

            let first = reconcile(&candidates, &s, &fetched, 1, &DomainPolicy::empty());
            let second = reconcile(&candidates, &s, &fetched, 1, &DomainPolicy::empty());

            prop_assert_eq!(first["Gewicht"].value.clone(), second["Gewicht"].value.clone());
            prop_assert_eq!(first["Gewicht"].consistency_count, second["Gewicht"].consistency_count);
            prop_assert_eq!(first["Gewicht"].confidence, second["Gewicht"].confidence);
        }
    }
}
