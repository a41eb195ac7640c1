//! Deduplication of resolved records.
//!
//! Two records describe the same work when both carry DOIs and the DOIs match
//! case-insensitively (resolver prefixes ignored), or, when at least one of
//! them lacks a DOI, when their normalized titles match. The first occurrence
//! wins and input order is preserved.

use std::borrow::Borrow;
use std::collections::HashMap;

use crate::input::normalize_doi;
use crate::models::NormalizedRecord;

/// A record dropped as a repeat of an earlier one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duplicate {
    /// Position of the dropped record
    pub index: usize,
    /// Position of the kept record it repeats
    pub original: usize,
}

/// Normalize a title for comparison: lowercase, punctuation to spaces,
/// whitespace collapsed
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn doi_key(record: &NormalizedRecord) -> Option<String> {
    record
        .doi
        .as_deref()
        .map(normalize_doi)
        .filter(|doi| !doi.is_empty())
}

fn title_key(record: &NormalizedRecord) -> Option<String> {
    record
        .title
        .as_deref()
        .map(normalize_title)
        .filter(|title| !title.is_empty())
}

/// Find records that repeat an earlier kept record.
///
/// Returned in ascending `index` order; every `original` is a kept record.
pub fn find_duplicates<T: Borrow<NormalizedRecord>>(records: &[T]) -> Vec<Duplicate> {
    let mut by_doi: HashMap<String, usize> = HashMap::new();
    let mut by_title: HashMap<String, usize> = HashMap::new();
    let mut by_title_without_doi: HashMap<String, usize> = HashMap::new();
    let mut duplicates = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let record = record.borrow();
        let doi = doi_key(record);
        let title = title_key(record);

        let original = match (&doi, &title) {
            (Some(doi), title) => by_doi.get(doi).copied().or_else(|| {
                title
                    .as_ref()
                    .and_then(|t| by_title_without_doi.get(t).copied())
            }),
            (None, Some(title)) => by_title.get(title).copied(),
            (None, None) => None,
        };

        if let Some(original) = original {
            tracing::debug!(
                "Record {} duplicates record {}: {}",
                index,
                original,
                record.primary_id()
            );
            duplicates.push(Duplicate { index, original });
            continue;
        }

        if let Some(title) = title {
            if doi.is_none() {
                by_title_without_doi.entry(title.clone()).or_insert(index);
            }
            by_title.entry(title).or_insert(index);
        }
        if let Some(doi) = doi {
            by_doi.insert(doi, index);
        }
    }

    duplicates
}

/// Remove later records that repeat an earlier one, keeping first occurrences
/// in their original order
pub fn deduplicate_records<T: Borrow<NormalizedRecord>>(records: Vec<T>) -> Vec<T> {
    let duplicates = find_duplicates(&records);
    if duplicates.is_empty() {
        return records;
    }

    let mut dropped = duplicates.iter().map(|d| d.index).peekable();
    records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| {
            if dropped.peek() == Some(&i) {
                dropped.next();
                None
            } else {
                Some(record)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, RecordBuilder};

    fn record(title: &str, doi: Option<&str>) -> NormalizedRecord {
        let builder = RecordBuilder::new()
            .title(title)
            .author(Author::new("Hinton", "Geoffrey"));
        match doi {
            Some(doi) => builder.doi(doi).build(),
            None => builder.build(),
        }
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("Deep Learning: A   Review!"),
            "deep learning a review"
        );
        assert_eq!(normalize_title("Self-Attention"), "self attention");
    }

    #[test]
    fn test_first_occurrence_wins_and_order_is_kept() {
        let a = record("Deep learning", Some("10.1038/nature14539"));
        let b = record("Reducing the dimensionality", Some("10.1126/science.1127647"));
        let a_again = record("Deep Learning.", Some("https://doi.org/10.1038/NATURE14539"));

        let result = deduplicate_records(vec![a.clone(), b.clone(), a_again]);
        assert_eq!(result, vec![a, b]);
    }

    #[test]
    fn test_title_match_when_one_side_lacks_doi() {
        let with_doi = record("Deep learning", Some("10.1038/nature14539"));
        let without = record("deep   learning", None);

        assert_eq!(
            find_duplicates(&[with_doi.clone(), without.clone()]),
            vec![Duplicate {
                index: 1,
                original: 0
            }]
        );
        assert_eq!(
            find_duplicates(&[without, with_doi]),
            vec![Duplicate {
                index: 1,
                original: 0
            }]
        );
    }

    #[test]
    fn test_distinct_dois_with_same_title_are_kept() {
        let preprint = record("Deep learning", Some("10.48550/arxiv.1234"));
        let article = record("Deep learning", Some("10.1038/nature14539"));
        assert!(find_duplicates(&[preprint, article]).is_empty());
    }

    #[test]
    fn test_records_without_title_or_doi_never_match() {
        let empty = NormalizedRecord::new();
        assert!(find_duplicates(&[empty.clone(), empty]).is_empty());
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let records = vec![
            record("A", Some("10.1/a")),
            record("B", None),
            record("a", None),
            record("C", Some("10.1/A")),
            record("b", Some("10.1/b")),
        ];
        let once = deduplicate_records(records);
        let twice = deduplicate_records(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_borrowed_records() {
        let a = record("Deep learning", Some("10.1038/nature14539"));
        let refs = vec![&a, &a];
        assert_eq!(deduplicate_records(refs).len(), 1);
    }
}
