//! Citation formatting.
//!
//! A citation is rendered as a list of [`Segment`]s rather than a flat
//! string, so exporters can apply their own emphasis, link and highlight
//! markup without re-parsing text. Every style is a [`StyleRules`] value
//! interpreted by [`format_citation`].

mod highlight;
mod names;
mod style;

pub use highlight::{author_matches, AuthorHighlighter};
pub use names::{layout_authors, render_name, NamePart, NO_AUTHORS};
pub use style::{
    CitationStyle, Emphasis, Field, NameForm, NameRules, Numbering, Piece, StyleError,
    StyleRules, Truncation,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::models::NormalizedRecord;

/// Placeholder for a record without a title
pub const NO_TITLE: &str = "Untitled";

/// Placeholder for a record without a year
pub const NO_DATE: &str = "n.d.";

/// Punctuation after which a leading `.` or `,` is dropped
const TERMINAL_PUNCTUATION: &[char] = &['.', ',', '?', '!', ';', ':'];

/// What a segment of citation text represents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentKind {
    /// Punctuation, field values and placeholders
    Text,
    /// The name of the author at this position in the record's author list
    Author { index: usize },
    /// A resolvable link
    Link { url: String },
}

/// A run of citation text with uniform presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub emphasis: Option<Emphasis>,
    pub kind: SegmentKind,
    /// Marked by an [`AuthorHighlighter`]
    #[serde(default)]
    pub highlighted: bool,
}

impl Segment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: None,
            kind: SegmentKind::Text,
            highlighted: false,
        }
    }

    /// Author index for author segments
    pub fn author_index(&self) -> Option<usize> {
        match self.kind {
            SegmentKind::Author { index } => Some(index),
            _ => None,
        }
    }
}

/// A record rendered in one citation style
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedCitation {
    /// The record this citation was rendered from
    pub record: Arc<NormalizedRecord>,
    pub style: CitationStyle,
    /// List position, when numbered
    pub number: Option<usize>,
    pub segments: Vec<Segment>,
}

impl FormattedCitation {
    /// Citation as plain text, without any markup
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Number of highlighted author segments
    pub fn highlighted_count(&self) -> usize {
        self.segments.iter().filter(|s| s.highlighted).count()
    }
}

impl fmt::Display for FormattedCitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            f.write_str(&segment.text)?;
        }
        Ok(())
    }
}

/// Accumulates segments and keeps punctuation from doubling up
#[derive(Debug, Default)]
struct CitationBuilder {
    segments: Vec<Segment>,
}

impl CitationBuilder {
    /// Last character written, looking through closing quotes
    fn last_char(&self) -> Option<char> {
        self.segments
            .iter()
            .rev()
            .flat_map(|s| s.text.chars().rev())
            .find(|c| !matches!(c, '"' | '\''))
    }

    /// Append punctuation, dropping a leading `.` or `,` that would follow
    /// terminal punctuation
    fn push_affix(&mut self, affix: &str) {
        let mut affix = affix;
        if affix.starts_with(&['.', ','][..])
            && self
                .last_char()
                .is_some_and(|c| TERMINAL_PUNCTUATION.contains(&c))
        {
            affix = &affix[1..];
        }
        self.push_text(affix);
    }

    /// Append unstyled text as is, merging it into a preceding plain segment
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(last) if last.kind == SegmentKind::Text && last.emphasis.is_none() => {
                last.text.push_str(text)
            }
            _ => self.segments.push(Segment::text(text)),
        }
    }

    fn push(&mut self, text: String, emphasis: Option<Emphasis>, kind: SegmentKind) {
        if emphasis.is_none() && kind == SegmentKind::Text {
            self.push_text(&text);
        } else if !text.is_empty() {
            self.segments.push(Segment {
                text,
                emphasis,
                kind,
                highlighted: false,
            });
        }
    }
}

/// Text and link target of a field, `None` when the record lacks it
fn field_value(record: &NormalizedRecord, field: Field) -> Option<(String, SegmentKind)> {
    let plain = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| (v.to_string(), SegmentKind::Text))
    };

    match field {
        Field::Title => Some(
            plain(&record.title).unwrap_or_else(|| (NO_TITLE.to_string(), SegmentKind::Text)),
        ),
        Field::Year => Some((
            record
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| NO_DATE.to_string()),
            SegmentKind::Text,
        )),
        Field::Journal => plain(&record.journal),
        Field::Volume => plain(&record.volume),
        Field::Issue => plain(&record.issue),
        Field::Pages => plain(&record.pages),
        Field::DoiUrl => record
            .doi_url()
            .map(|url| (url.clone(), SegmentKind::Link { url })),
        Field::Doi => {
            let url = record.doi_url()?;
            plain(&record.doi).map(|(doi, _)| (doi, SegmentKind::Link { url }))
        }
    }
}

/// Render `record` in `style`, optionally prefixed with its list position.
///
/// Formatting is deterministic: the same record, style and number always
/// produce the same segments.
pub fn format_citation(
    record: &Arc<NormalizedRecord>,
    style: CitationStyle,
    number: Option<usize>,
) -> FormattedCitation {
    let rules = style.rules();
    let mut builder = CitationBuilder::default();

    if let Some(number) = number {
        builder.push_text(&rules.numbering.prefix(number));
    }

    for part in layout_authors(&record.authors, &rules.names) {
        match part {
            NamePart::Name(index, name) => {
                builder.push(name, None, SegmentKind::Author { index })
            }
            NamePart::Text(text) => builder.push_text(&text),
        }
    }

    let mut ended_with_doi = false;
    for piece in rules.pieces {
        // An issue number is only printed alongside its volume.
        if piece.field == Field::Issue && field_value(record, Field::Volume).is_none() {
            continue;
        }
        let Some((value, kind)) = field_value(record, piece.field) else {
            continue;
        };
        builder.push_affix(piece.before);
        builder.push(value, piece.emphasis, kind);
        builder.push_affix(piece.after);
        ended_with_doi = matches!(piece.field, Field::Doi | Field::DoiUrl);
    }

    builder.push_affix(if ended_with_doi {
        rules.close_after_doi
    } else {
        rules.close
    });

    FormattedCitation {
        record: Arc::clone(record),
        style,
        number,
        segments: builder.segments,
    }
}

/// Format records as a list, numbering from 1 when `numbered` is set and
/// highlighting authors when a highlighter is given
pub fn format_list<'a, I>(
    records: I,
    style: CitationStyle,
    numbered: bool,
    highlighter: Option<&AuthorHighlighter>,
) -> Vec<FormattedCitation>
where
    I: IntoIterator<Item = &'a Arc<NormalizedRecord>>,
{
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            let mut citation = format_citation(record, style, numbered.then_some(i + 1));
            if let Some(highlighter) = highlighter {
                highlighter.apply(&mut citation);
            }
            citation
        })
        .collect()
}
