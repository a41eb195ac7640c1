//! Normalized bibliographic record produced by a lookup source.

use serde::{Deserialize, Serialize};

/// A single contributor to a work.
///
/// Organizations and other corporate authors are stored with the name in
/// `family` and no given name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    /// Family name (surname), or the full name of a corporate author
    pub family: String,

    /// Given name(s), possibly already abbreviated ("G. E.")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
}

impl Author {
    /// Create an author from family and given names
    pub fn new(family: impl Into<String>, given: impl Into<String>) -> Self {
        let given = given.into();
        let given = given.trim();
        Self {
            family: family.into().trim().to_string(),
            given: (!given.is_empty()).then(|| given.to_string()),
        }
    }

    /// Create a family-only author (organization, consortium, mononym)
    pub fn literal(name: impl Into<String>) -> Self {
        Self {
            family: name.into().trim().to_string(),
            given: None,
        }
    }

    /// Given names split into their whitespace-separated parts
    pub fn given_parts(&self) -> Vec<&str> {
        self.given
            .as_deref()
            .map(|g| g.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Initials of the given names, one entry per given name.
    ///
    /// Hyphenated names keep their hyphen: "Yee-Whye" yields `"Y.-W."` in the
    /// dotted form and `"YW"` in the compact form.
    pub fn initials(&self, dotted: bool) -> Vec<String> {
        self.given_parts()
            .into_iter()
            .filter_map(|part| {
                let pieces: Vec<String> = part
                    .split('-')
                    .filter_map(|p| p.chars().find(|c| c.is_alphabetic()))
                    .map(|c| {
                        let upper: String = c.to_uppercase().collect();
                        if dotted {
                            format!("{}.", upper)
                        } else {
                            upper
                        }
                    })
                    .collect();
                if pieces.is_empty() {
                    None
                } else if dotted {
                    Some(pieces.join("-"))
                } else {
                    Some(pieces.concat())
                }
            })
            .collect()
    }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.given {
            Some(given) => write!(f, "{} {}", given, self.family),
            None => write!(f, "{}", self.family),
        }
    }
}

/// The canonical representation of a looked-up work.
///
/// Independent of how the work was queried; DOI serves as the natural
/// identifier when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Title of the work
    pub title: Option<String>,

    /// Authors in citation order
    #[serde(default)]
    pub authors: Vec<Author>,

    /// Container title (journal, proceedings, book), or the publisher when absent
    pub journal: Option<String>,

    /// Publication year
    pub year: Option<i32>,

    /// Volume
    pub volume: Option<String>,

    /// Issue number
    pub issue: Option<String>,

    /// Page range or article number
    pub pages: Option<String>,

    /// Publisher name
    pub publisher: Option<String>,

    /// Digital Object Identifier (bare, without resolver prefix)
    pub doi: Option<String>,
}

impl NormalizedRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self {
            title: None,
            authors: Vec::new(),
            journal: None,
            year: None,
            volume: None,
            issue: None,
            pages: None,
            publisher: None,
            doi: None,
        }
    }

    /// A record can be cited when it has a title and at least one author,
    /// or when it carries a DOI.
    pub fn is_usable(&self) -> bool {
        let has_title = self.title.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_doi = self.doi.as_deref().is_some_and(|d| !d.trim().is_empty());
        (has_title && !self.authors.is_empty()) || has_doi
    }

    /// Returns the primary identifier for logs (DOI if available, else title)
    pub fn primary_id(&self) -> &str {
        self.doi
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or("<untitled>")
    }

    /// URL form of the DOI
    pub fn doi_url(&self) -> Option<String> {
        self.doi.as_ref().map(|doi| format!("https://doi.org/{}", doi))
    }
}

impl Default for NormalizedRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing records
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    record: NormalizedRecord,
}

/// Trimmed, non-empty version of a string
fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl RecordBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.record.title = non_empty(title);
        self
    }

    /// Append an author
    pub fn author(mut self, author: Author) -> Self {
        self.record.authors.push(author);
        self
    }

    /// Replace the author list
    pub fn authors(mut self, authors: Vec<Author>) -> Self {
        self.record.authors = authors;
        self
    }

    /// Set container title
    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.record.journal = non_empty(journal);
        self
    }

    /// Set publication year
    pub fn year(mut self, year: i32) -> Self {
        self.record.year = Some(year);
        self
    }

    /// Set volume
    pub fn volume(mut self, volume: impl Into<String>) -> Self {
        self.record.volume = non_empty(volume);
        self
    }

    /// Set issue
    pub fn issue(mut self, issue: impl Into<String>) -> Self {
        self.record.issue = non_empty(issue);
        self
    }

    /// Set pages
    pub fn pages(mut self, pages: impl Into<String>) -> Self {
        self.record.pages = non_empty(pages);
        self
    }

    /// Set publisher
    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.record.publisher = non_empty(publisher);
        self
    }

    /// Set DOI
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.record.doi = non_empty(doi);
        self
    }

    /// Build the record
    pub fn build(self) -> NormalizedRecord {
        self.record
    }
}
