//! Reading reference lines and deciding what kind of lookup each needs.

mod classify;
mod doi;

pub use classify::{
    classify, classify_text, is_comment, line_key, looks_like_author, looks_like_journal,
    parse_lines, FIELD_DELIMITER,
};
pub use doi::{find_doi, normalize_doi, parse_doi};
