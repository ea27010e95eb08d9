use std::collections::HashSet;

use super::normalize::NormalizedRecord;

/// Order-preserving DOI deduplicator.
///
/// Owns the set of admitted DOIs for one pipeline run; construct a fresh
/// instance per run. Not safe for concurrent use without external
/// synchronization.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the first occurrence of each DOI, in input order. Records with
    /// an empty DOI are dropped unconditionally. State accumulates across
    /// calls on the same instance.
    pub fn deduplicate(&mut self, records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
        records
            .into_iter()
            .filter(|record| !record.doi.is_empty() && self.seen.insert(record.doi.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(doi: &str) -> NormalizedRecord {
        NormalizedRecord {
            title: "T".to_string(),
            authors: String::new(),
            published_date: None,
            doi: doi.to_string(),
            journal: "J".to_string(),
            publisher: "P".to_string(),
            is_referenced_by_count: 0,
            reference_count: 0,
        }
    }

    #[test]
    fn test_duplicate_doi_dropped_order_preserved() {
        let mut dedup = Deduplicator::new();
        let out = dedup.deduplicate(vec![record("10.1/a"), record("10.1/x"), record("10.1/a")]);
        let dois: Vec<&str> = out.iter().map(|r| r.doi.as_str()).collect();
        assert_eq!(dois, vec!["10.1/a", "10.1/x"]);
    }

    #[test]
    fn test_empty_doi_dropped_even_as_first_occurrence() {
        let mut dedup = Deduplicator::new();
        let out = dedup.deduplicate(vec![record(""), record("10.1/a")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].doi, "10.1/a");
    }

    #[test]
    fn test_idempotent_on_deduplicated_batch() {
        let batch = vec![record("10.1/a"), record("10.1/b")];
        let mut first = Deduplicator::new();
        let once = first.deduplicate(batch);
        let mut second = Deduplicator::new();
        let twice = second.deduplicate(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_output_never_longer_and_dois_unique() {
        let input = vec![
            record("10.1/a"),
            record("10.1/a"),
            record(""),
            record("10.1/b"),
            record("10.1/b"),
        ];
        let input_len = input.len();
        let mut dedup = Deduplicator::new();
        let out = dedup.deduplicate(input);
        assert!(out.len() <= input_len);

        let mut unique = HashSet::new();
        for r in &out {
            assert!(unique.insert(r.doi.clone()));
        }
    }

    #[test]
    fn test_state_persists_across_calls() {
        let mut dedup = Deduplicator::new();
        let first = dedup.deduplicate(vec![record("10.1/a")]);
        assert_eq!(first.len(), 1);

        let second = dedup.deduplicate(vec![record("10.1/a"), record("10.1/b")]);
        let dois: Vec<&str> = second.iter().map(|r| r.doi.as_str()).collect();
        assert_eq!(dois, vec!["10.1/b"]);
    }
}
