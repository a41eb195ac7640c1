//! Author name forms and author-list layout.

use super::style::{NameForm, NameRules};
use crate::models::Author;

/// Placeholder for a record with no authors
pub const NO_AUTHORS: &str = "Unknown";

/// One item of a laid-out author list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePart {
    /// Rendered name of the author at this position in the record
    Name(usize, String),
    /// Delimiter, conjunction or et-al. marker
    Text(String),
}

/// Write one author in the given form
pub fn render_name(author: &Author, form: NameForm) -> String {
    let family = author.family.as_str();
    let Some(given) = author.given.as_deref() else {
        return family.to_string();
    };

    match form {
        NameForm::FamilyOnly => family.to_string(),
        NameForm::FamilyGiven => format!("{}, {}", family, given),
        NameForm::GivenFamily => format!("{} {}", given, family),
        NameForm::FamilyInitials => match dotted_initials(author) {
            Some(initials) => format!("{}, {}", family, initials),
            None => family.to_string(),
        },
        NameForm::InitialsFamily => match dotted_initials(author) {
            Some(initials) => format!("{} {}", initials, family),
            None => family.to_string(),
        },
        NameForm::FamilyCompact => {
            let initials = author.initials(false).concat();
            if initials.is_empty() {
                family.to_string()
            } else {
                format!("{} {}", family, initials)
            }
        }
    }
}

fn dotted_initials(author: &Author) -> Option<String> {
    let initials = author.initials(true);
    (!initials.is_empty()).then(|| initials.join(" "))
}

/// Lay out the author list following the style's conjunction and
/// truncation rules
pub fn layout_authors(authors: &[Author], rules: &NameRules) -> Vec<NamePart> {
    let name = |i: usize| {
        let form = if i == 0 { rules.first } else { rules.rest };
        NamePart::Name(i, render_name(&authors[i], form))
    };
    let text = |s: &str| NamePart::Text(s.to_string());

    let count = authors.len();
    if count == 0 {
        return vec![text(NO_AUTHORS)];
    }

    if let Some(truncation) = rules.truncation.filter(|t| count > t.max) {
        let keep = truncation.keep.clamp(1, count);
        let mut parts = Vec::with_capacity(keep * 2 + 2);
        for i in 0..keep {
            if i > 0 {
                parts.push(text(rules.delimiter));
            }
            parts.push(name(i));
        }
        parts.push(text(truncation.marker));
        if truncation.keep_last && keep < count {
            parts.push(name(count - 1));
        }
        return parts;
    }

    match count {
        1 => vec![name(0)],
        2 => vec![name(0), text(rules.pair), name(1)],
        _ => {
            let mut parts = Vec::with_capacity(count * 2);
            for i in 0..count {
                if i == count - 1 {
                    parts.push(text(rules.last));
                } else if i > 0 {
                    parts.push(text(rules.delimiter));
                }
                parts.push(name(i));
            }
            parts
        }
    }
}
