//! Input lines, typed queries and the search requests derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single non-comment input line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLine {
    /// 1-based line number in the original input
    pub number: usize,

    /// Line text with surrounding whitespace removed
    pub text: String,
}

impl RawLine {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// The shape of a reference description, decided by the line classifier.
///
/// Every raw line maps to exactly one variant; `FreeText` is the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    /// Direct lookup by DOI (bare form, as written)
    Doi { doi: String },

    /// A title, optionally with a year
    TitleYear { title: String, year: Option<i32> },

    /// Author and journal, optionally with a year
    AuthorJournalYear {
        author: String,
        journal: String,
        year: Option<i32>,
    },

    /// Title and journal, optionally with a year
    TitleJournalYear {
        title: String,
        journal: String,
        year: Option<i32>,
    },

    /// The most specific fuzzy input
    AuthorTitleJournalYear {
        author: String,
        title: String,
        journal: String,
        year: Option<i32>,
    },

    /// Raw search text for lines matching no other shape
    FreeText { text: String },
}

impl Query {
    /// Short identifier of the query shape
    pub fn kind(&self) -> &'static str {
        match self {
            Query::Doi { .. } => "doi",
            Query::TitleYear { .. } => "title_year",
            Query::AuthorJournalYear { .. } => "author_journal_year",
            Query::TitleJournalYear { .. } => "title_journal_year",
            Query::AuthorTitleJournalYear { .. } => "author_title_journal_year",
            Query::FreeText { .. } => "free_text",
        }
    }

    /// The DOI, for DOI queries
    pub fn doi(&self) -> Option<&str> {
        match self {
            Query::Doi { doi } => Some(doi),
            _ => None,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = |y: &Option<i32>| y.map(|y| format!(" [{}]", y)).unwrap_or_default();
        match self {
            Query::Doi { doi } => write!(f, "doi {}", doi),
            Query::TitleYear { title, year: y } => write!(f, "title \"{}\"{}", title, year(y)),
            Query::AuthorJournalYear {
                author,
                journal,
                year: y,
            } => write!(f, "author \"{}\" in \"{}\"{}", author, journal, year(y)),
            Query::TitleJournalYear {
                title,
                journal,
                year: y,
            } => write!(f, "title \"{}\" in \"{}\"{}", title, journal, year(y)),
            Query::AuthorTitleJournalYear {
                author,
                title,
                journal,
                year: y,
            } => write!(
                f,
                "author \"{}\", title \"{}\" in \"{}\"{}",
                author,
                title,
                journal,
                year(y)
            ),
            Query::FreeText { text } => write!(f, "free text \"{}\"", text),
        }
    }
}

/// Structured search terms sent to a bibliographic search endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Title terms
    pub title: Option<String>,

    /// Author terms
    pub author: Option<String>,

    /// Container (journal) terms
    pub container: Option<String>,

    /// Publication year filter
    pub year: Option<i32>,

    /// Unstructured bibliographic text
    pub bibliographic: Option<String>,

    /// Number of ranked candidates to request
    pub rows: usize,
}

impl SearchRequest {
    /// Build the search terms for a non-DOI query.
    ///
    /// Returns `None` for DOI queries, which are fetched directly.
    pub fn from_query(query: &Query, rows: usize) -> Option<Self> {
        let mut request = Self {
            title: None,
            author: None,
            container: None,
            year: None,
            bibliographic: None,
            rows: rows.max(1),
        };

        match query {
            Query::Doi { .. } => return None,
            Query::TitleYear { title, year } => {
                request.title = Some(title.clone());
                request.year = *year;
            }
            Query::AuthorJournalYear {
                author,
                journal,
                year,
            } => {
                request.author = Some(author.clone());
                request.container = Some(journal.clone());
                request.year = *year;
            }
            Query::TitleJournalYear {
                title,
                journal,
                year,
            } => {
                request.title = Some(title.clone());
                request.container = Some(journal.clone());
                request.year = *year;
            }
            Query::AuthorTitleJournalYear {
                author,
                title,
                journal,
                year,
            } => {
                request.author = Some(author.clone());
                request.title = Some(title.clone());
                request.container = Some(journal.clone());
                request.year = *year;
            }
            Query::FreeText { text } => {
                request.bibliographic = Some(text.clone());
            }
        }

        Some(request)
    }

    /// Whether any search term is present
    pub fn has_terms(&self) -> bool {
        [&self.title, &self.author, &self.container, &self.bibliographic]
            .iter()
            .any(|term| term.as_deref().is_some_and(|t| t.chars().any(char::is_alphanumeric)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_from_doi_query() {
        let query = Query::Doi {
            doi: "10.1038/nature12345".to_string(),
        };
        assert!(SearchRequest::from_query(&query, 3).is_none());
    }

    #[test]
    fn test_search_request_fields() {
        let query = Query::AuthorTitleJournalYear {
            author: "Vaswani".to_string(),
            title: "Attention is all you need".to_string(),
            journal: "NeurIPS".to_string(),
            year: Some(2017),
        };
        let request = SearchRequest::from_query(&query, 0).unwrap();
        assert_eq!(request.author.as_deref(), Some("Vaswani"));
        assert_eq!(request.title.as_deref(), Some("Attention is all you need"));
        assert_eq!(request.container.as_deref(), Some("NeurIPS"));
        assert_eq!(request.year, Some(2017));
        assert_eq!(request.rows, 1);
        assert!(request.has_terms());
    }

    #[test]
    fn test_free_text_without_alphanumerics_has_no_terms() {
        let query = Query::FreeText {
            text: "#### ----".to_string(),
        };
        let request = SearchRequest::from_query(&query, 3).unwrap();
        assert!(!request.has_terms());
    }

    #[test]
    fn test_query_display() {
        let query = Query::TitleYear {
            title: "Deep learning".to_string(),
            year: Some(2015),
        };
        assert_eq!(query.to_string(), "title \"Deep learning\" [2015]");
        assert_eq!(query.kind(), "title_year");
    }
}
