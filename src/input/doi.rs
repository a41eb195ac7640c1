//! DOI recognition and normalization.
//!
//! DOIs have the format "10.xxxx/suffix" where xxxx is a registrant code of
//! four to nine digits. They appear in input either bare, with a `doi:`
//! prefix, or as a resolver URL (`https://doi.org/...`, `http://dx.doi.org/...`).

use regex::Regex;
use std::sync::OnceLock;

fn bare_doi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("DOI pattern is valid"))
}

fn resolver_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:https?://(?:www\.|dx\.)?doi\.org/|doi:\s*)")
            .expect("resolver pattern is valid")
    })
}

/// Strip resolver prefixes and percent-encoding from a DOI-like token.
fn strip_resolver(token: &str) -> Option<String> {
    let token = token.trim();
    let stripped = resolver_prefix_regex().replace(token, "");
    let had_prefix = stripped.len() != token.len();

    if had_prefix && stripped.contains('%') {
        return urlencoding::decode(&stripped).ok().map(|s| s.into_owned());
    }
    Some(stripped.into_owned())
}

/// Recognize a single token as a DOI.
///
/// Returns the bare DOI with its original casing. Trailing sentence
/// punctuation (`.`, `,`, `;`) is not part of the DOI.
pub fn parse_doi(token: &str) -> Option<String> {
    let bare = strip_resolver(token)?;
    let bare = bare.trim_end_matches(&['.', ',', ';'][..]);

    if bare_doi_regex().is_match(bare) {
        Some(bare.to_string())
    } else {
        None
    }
}

/// Find the first DOI among the whitespace- or pipe-separated tokens of a line
pub fn find_doi(line: &str) -> Option<String> {
    line.split(|c: char| c.is_whitespace() || c == '|')
        .filter(|token| !token.is_empty())
        .find_map(parse_doi)
}

/// Canonical comparison form of a DOI: bare and lowercase
pub fn normalize_doi(doi: &str) -> String {
    strip_resolver(doi)
        .unwrap_or_else(|| doi.to_string())
        .trim()
        .to_lowercase()
}
