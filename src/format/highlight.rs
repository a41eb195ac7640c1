//! Author highlighting.
//!
//! Highlighting marks whole author segments of a formatted citation, so it
//! never splits a name and never wraps the same name twice.

use super::FormattedCitation;
use crate::models::Author;
use std::sync::Arc;

/// Whether `query` names `author`.
///
/// Accepts the family name, given names, full name, "family, given" forms,
/// initials in either order, a family-name prefix, and for queries of three
/// or more characters a family-name substring or the first given name.
/// Comparison ignores case and surrounding whitespace.
pub fn author_matches(author: &Author, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return false;
    }

    let family = author.family.trim().to_lowercase();
    let given = author
        .given
        .as_deref()
        .map(|g| g.trim().to_lowercase())
        .unwrap_or_default();
    let first_given = given.split_whitespace().next().unwrap_or_default();
    let initials: String = given
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .collect();
    let long_query = q.chars().count() >= 3;

    let candidates = [
        family.clone(),
        given.clone(),
        format!("{} {}", given, family).trim().to_string(),
        format!("{}, {}", family, given),
        format!("{} {}", first_given, family).trim().to_string(),
        format!("{}, {}", family, first_given).trim().to_string(),
        format!("{} {}", family, initials),
        format!("{} {}", initials, family),
        format!("{}, {}", family, initials),
    ];

    candidates.iter().any(|c| *c == q)
        || (!family.is_empty() && family.starts_with(&q))
        || (long_query && family.contains(&q))
        || (long_query && first_given == q)
}

/// Marks the authors of formatted citations that match any configured name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorHighlighter {
    targets: Vec<String>,
}

impl AuthorHighlighter {
    /// Build a highlighter from user-supplied names; blank names are ignored
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut targets: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        targets.sort_unstable();
        targets.dedup();
        Self { targets }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Lowercased target names, sorted and unique
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Whether `author` matches any target, either by name or by the text
    /// the style rendered for them
    fn matches(&self, author: Option<&Author>, rendered: &str) -> bool {
        let rendered = rendered.to_lowercase();
        self.targets.iter().any(|target| {
            author.is_some_and(|a| author_matches(a, target)) || rendered.contains(target.as_str())
        })
    }

    /// Mark matching author segments of `citation`, returning how many were
    /// marked
    pub fn apply(&self, citation: &mut FormattedCitation) -> usize {
        if self.is_empty() {
            return 0;
        }

        let record = Arc::clone(&citation.record);
        let mut marked = 0;
        for segment in &mut citation.segments {
            let Some(index) = segment.author_index() else {
                continue;
            };
            if self.matches(record.authors.get(index), &segment.text) {
                segment.highlighted = true;
                marked += 1;
            }
        }

        if marked > 0 {
            tracing::debug!("Highlighted {} author(s) in {}", marked, record.primary_id());
        }
        marked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{format_citation, CitationStyle};
    use crate::models::RecordBuilder;

    fn doe() -> Author {
        Author::new("Doe", "Jon Andrew")
    }

    #[test]
    fn test_author_matches_name_forms() {
        let author = doe();
        for query in [
            "doe",
            "Jon Andrew",
            "jon andrew doe",
            "doe, jon andrew",
            "Jon Doe",
            "doe, jon",
            "doe ja",
            "ja doe",
            "doe, ja",
            "do",
            "jon",
            "  DOE  ",
        ] {
            assert!(author_matches(&author, query), "query {query:?}");
        }
    }

    #[test]
    fn test_author_matches_substring_needs_three_chars() {
        let author = Author::new("Salakhutdinov", "Ruslan");
        assert!(author_matches(&author, "khut"));
        assert!(!author_matches(&author, "ak"));
        assert!(!author_matches(&author, "ru"));
    }

    #[test]
    fn test_author_matches_rejects_others() {
        assert!(!author_matches(&doe(), "smith"));
        assert!(!author_matches(&doe(), ""));
        assert!(!author_matches(&Author::literal("WHO"), "jon"));
    }

    #[test]
    fn test_apply_marks_only_matching_authors() {
        let record = RecordBuilder::new()
            .title("Reducing the dimensionality of data with neural networks")
            .author(Author::new("Hinton", "Geoffrey E."))
            .author(Author::new("Salakhutdinov", "Ruslan R."))
            .journal("Science")
            .year(2006)
            .build();
        let record = Arc::new(record);
        let mut citation = format_citation(&record, CitationStyle::Apa, Some(1));

        let highlighter = AuthorHighlighter::new(["Hinton", " "]);
        assert_eq!(highlighter.targets(), ["hinton"]);
        assert_eq!(highlighter.apply(&mut citation), 1);

        let marked: Vec<&str> = citation
            .segments
            .iter()
            .filter(|s| s.highlighted)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(marked, vec!["Hinton, G. E."]);
        assert_eq!(citation.highlighted_count(), 1);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let record = RecordBuilder::new()
            .title("Deep learning")
            .author(Author::new("LeCun", "Yann"))
            .build();
        let record = Arc::new(record);
        let mut citation = format_citation(&record, CitationStyle::Ieee, None);
        let highlighter = AuthorHighlighter::new(["lecun"]);
        highlighter.apply(&mut citation);
        let once = citation.clone();
        highlighter.apply(&mut citation);
        assert_eq!(citation, once);
    }

    #[test]
    fn test_repeated_names_are_kept_once() {
        let highlighter = AuthorHighlighter::new(["Hinton", "LeCun", " hinton "]);
        assert_eq!(highlighter.targets(), ["hinton", "lecun"]);
    }

    #[test]
    fn test_empty_highlighter_marks_nothing() {
        let record = RecordBuilder::new()
            .title("Deep learning")
            .author(Author::new("LeCun", "Yann"))
            .build();
        let record = Arc::new(record);
        let mut citation = format_citation(&record, CitationStyle::Nature, None);
        assert_eq!(AuthorHighlighter::default().apply(&mut citation), 0);
        assert_eq!(citation.highlighted_count(), 0);
    }
}
