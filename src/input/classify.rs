//! Heuristic classification of a reference line into a query shape.
//!
//! Supported line formats (auto-detected, no tags needed):
//!
//! ```text
//! 10.1038/nature12345                                   DOI (bare or resolver URL)
//! Attention is all you need | 2017                      title | year
//! Hinton | Nature | 2006                                author | journal | year
//! Attention is all you need | Nature | 2023             title | journal | year
//! Vaswani | Attention is all you need | NeurIPS | 2017  author | title | journal | year
//! Attention is all you need                             title only
//! ```
//!
//! Classification never fails: anything that matches no shape becomes a
//! [`Query::FreeText`] search.

use regex::Regex;
use std::sync::OnceLock;

use super::doi::find_doi;
use crate::models::{Query, RawLine};

/// Separator between fields of a structured line
pub const FIELD_DELIMITER: char = '|';

/// Venue keywords that mark a segment as a journal or proceedings name
const JOURNAL_HINTS: &[&str] = &[
    "nature", "science", "cell", "lancet", "nejm", "jama", "bmj", "pnas", "plos", "ieee", "acm",
    "neurips", "nips", "icml", "iclr", "cvpr", "iccv", "eccv", "aaai", "ijcai", "emnlp", "acl",
    "naacl", "arxiv", "biorxiv", "medrxiv", "annals", "journal", "j", "letters", "review",
    "reviews", "proceedings", "proc", "transactions", "trans", "frontiers", "bulletin",
    "quarterly", "magazine", "conference", "symposium", "workshop",
];

/// Function words that do not occur in a bare author name
const TITLE_WORDS: &[&str] = &[
    "a", "an", "the", "of", "for", "in", "on", "with", "and", "to", "is", "are", "from", "by",
    "at", "via", "using", "toward", "towards", "into", "how", "what", "why",
];

fn year_only_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\(?((?:19|20)\d{2})\)?\.?$").expect("year pattern is valid"))
}

fn trailing_year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\s,;(]+\(?((?:19|20)\d{2})\)?\.?$").expect("trailing year pattern is valid")
    })
}

/// Whether a line is a comment: `#` alone or `#` followed by whitespace.
///
/// A run of hashes glued to text (`###garbage###`) is content, not a comment.
pub fn is_comment(line: &str) -> bool {
    let line = line.trim_start();
    match line.strip_prefix('#') {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

/// Split input text into numbered reference lines, dropping blanks and comments
pub fn parse_lines(input: &str) -> Vec<RawLine> {
    input
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let text = line.trim();
            if text.is_empty() || is_comment(text) {
                None
            } else {
                Some(RawLine::new(idx + 1, text))
            }
        })
        .collect()
}

/// Classify one reference line
pub fn classify(line: &RawLine) -> Query {
    classify_text(&line.text)
}

/// Classify reference text into exactly one query shape
pub fn classify_text(text: &str) -> Query {
    let text = text.trim();

    if let Some(doi) = find_doi(text) {
        return Query::Doi { doi };
    }

    let free_text = || Query::FreeText {
        text: text.to_string(),
    };

    let segments: Vec<&str> = text
        .split(FIELD_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        return free_text();
    }

    let (mut fields, year) = extract_year(&segments);

    if fields.iter().any(|f| !f.chars().any(char::is_alphanumeric)) {
        return free_text();
    }

    match fields.len() {
        0 => free_text(),
        1 => {
            let title = fields.remove(0);
            if looks_like_text(&title) {
                Query::TitleYear { title, year }
            } else {
                free_text()
            }
        }
        2 => {
            let journal = fields.remove(1);
            let first = fields.remove(0);
            if looks_like_author(&first) && looks_like_journal(&journal) {
                Query::AuthorJournalYear {
                    author: first,
                    journal,
                    year,
                }
            } else {
                // Ties fall back to treating the first segment as the title.
                Query::TitleJournalYear {
                    title: first,
                    journal,
                    year,
                }
            }
        }
        n => {
            let journal = fields.remove(n - 1);
            let author = fields.remove(0);
            let title = fields.join(" ");
            Query::AuthorTitleJournalYear {
                author,
                title,
                journal,
                year,
            }
        }
    }
}

/// Pull a publication year out of the segments.
///
/// A segment that is only a year wins (the last one, if several); otherwise a
/// trailing year token is cut from the first segment that has one.
fn extract_year(segments: &[&str]) -> (Vec<String>, Option<i32>) {
    if let Some(pos) = segments
        .iter()
        .rposition(|s| year_only_regex().is_match(s))
    {
        let year = year_only_regex()
            .captures(segments[pos])
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok());
        let fields = segments
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != pos)
            .map(|(_, s)| s.to_string())
            .collect();
        return (fields, year);
    }

    let mut year = None;
    let fields = segments
        .iter()
        .map(|segment| {
            if year.is_some() {
                return segment.to_string();
            }
            match trailing_year_regex().captures(segment) {
                Some(caps) => {
                    let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
                        return segment.to_string();
                    };
                    let rest = segment[..whole.start()].trim();
                    if rest.is_empty() {
                        return segment.to_string();
                    }
                    year = digits.as_str().parse().ok();
                    rest.to_string()
                }
                None => segment.to_string(),
            }
        })
        .collect();
    (fields, year)
}

/// Whether a lone segment reads like a title or sentence
fn looks_like_text(text: &str) -> bool {
    let Some(first) = text.chars().next() else {
        return false;
    };
    if !(first.is_alphanumeric() || matches!(first, '"' | '\'' | '\u{201C}' | '\u{2018}' | '(')) {
        return false;
    }
    let visible = text.chars().filter(|c| !c.is_whitespace()).count();
    let alnum = text.chars().filter(|c| c.is_alphanumeric()).count();
    alnum * 2 >= visible
}

fn words_lower(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Heuristic: a known venue keyword, or a short name (at most three words)
pub fn looks_like_journal(text: &str) -> bool {
    let text = text.trim();
    if words_lower(text)
        .iter()
        .any(|w| JOURNAL_HINTS.contains(&w.as_str()))
    {
        return true;
    }
    text.split_whitespace().count() <= 3 && text.chars().count() <= 40
}

/// Heuristic: a surname or "Surname, F." with no digits, no function words
/// and not an all-caps acronym
///
/// Short capitalised titles such as "Deep Learning" pass as names too, so
/// `Deep Learning | Nature | 2015` classifies as author + journal + year.
pub fn looks_like_author(text: &str) -> bool {
    let text = text.trim();
    if text.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || words.len() > 3 {
        return false;
    }
    if words.iter().any(|w| w.chars().count() < 2) {
        return false;
    }
    if words_lower(text)
        .iter()
        .any(|w| TITLE_WORDS.contains(&w.as_str()))
    {
        return false;
    }

    if let [word] = words.as_slice() {
        let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.len() >= 3 && letters.iter().all(|c| c.is_uppercase()) {
            return false;
        }
    }
    true
}

/// Key used to spot the same reference line written twice.
///
/// DOI lines compare by their normalized DOI; everything else by lowercased
/// text with punctuation dropped and whitespace collapsed.
pub fn line_key(text: &str) -> String {
    if let Some(doi) = find_doi(text) {
        return format!("doi:{}", super::doi::normalize_doi(&doi));
    }

    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title_year(title: &str, year: Option<i32>) -> Query {
        Query::TitleYear {
            title: title.to_string(),
            year,
        }
    }

    #[test]
    fn test_is_comment() {
        assert!(is_comment("# a comment"));
        assert!(is_comment("#"));
        assert!(is_comment("   #\tindented"));
        assert!(!is_comment("###garbage###"));
        assert!(!is_comment("#hashtag"));
        assert!(!is_comment("10.1038/nature12345"));
    }

    #[test]
    fn test_parse_lines_numbers_and_skips() {
        let input = "# header\n\n10.1038/nature12345\n   \n###garbage###\n# done\n";
        let lines = parse_lines(input);
        assert_eq!(
            lines,
            vec![
                RawLine::new(3, "10.1038/nature12345"),
                RawLine::new(5, "###garbage###"),
            ]
        );
    }

    #[test]
    fn test_doi_forms_classify_identically() {
        let expected = Query::Doi {
            doi: "10.1038/nature12345".to_string(),
        };
        for form in [
            "10.1038/nature12345",
            "https://doi.org/10.1038/nature12345",
            "http://dx.doi.org/10.1038/nature12345",
            "doi:10.1038/nature12345",
            "  10.1038/nature12345  ",
        ] {
            assert_eq!(classify_text(form), expected, "form {form:?}");
        }
    }

    #[test]
    fn test_doi_anywhere_in_line_wins() {
        assert_eq!(
            classify_text("Deep learning | Nature | 10.1038/nature14539"),
            Query::Doi {
                doi: "10.1038/nature14539".to_string()
            }
        );
    }

    #[test]
    fn test_title_only() {
        assert_eq!(
            classify_text("Attention is all you need"),
            title_year("Attention is all you need", None)
        );
    }

    #[test]
    fn test_title_with_trailing_year() {
        assert_eq!(
            classify_text("Attention is all you need (2017)"),
            title_year("Attention is all you need", Some(2017))
        );
        assert_eq!(
            classify_text("Attention is all you need, 2017"),
            title_year("Attention is all you need", Some(2017))
        );
    }

    #[test]
    fn test_leading_year_stays_in_title() {
        assert_eq!(
            classify_text("2001: A Space Odyssey"),
            title_year("2001: A Space Odyssey", None)
        );
    }

    #[test]
    fn test_title_pipe_year() {
        assert_eq!(
            classify_text("Attention is all you need | 2017"),
            title_year("Attention is all you need", Some(2017))
        );
    }

    #[test]
    fn test_author_journal_year() {
        assert_eq!(
            classify_text("Hinton | Nature | 2006"),
            Query::AuthorJournalYear {
                author: "Hinton".to_string(),
                journal: "Nature".to_string(),
                year: Some(2006),
            }
        );
        assert_eq!(
            classify_text("Hinton, G. | Science"),
            Query::AuthorJournalYear {
                author: "Hinton, G.".to_string(),
                journal: "Science".to_string(),
                year: None,
            }
        );
    }

    #[test]
    fn test_short_capitalized_title_reads_as_author() {
        assert_eq!(
            classify_text("Deep Learning | Nature | 2015"),
            Query::AuthorJournalYear {
                author: "Deep Learning".to_string(),
                journal: "Nature".to_string(),
                year: Some(2015),
            }
        );
    }

    #[test]
    fn test_title_journal_year() {
        assert_eq!(
            classify_text("Attention is all you need | Nature | 2023"),
            Query::TitleJournalYear {
                title: "Attention is all you need".to_string(),
                journal: "Nature".to_string(),
                year: Some(2023),
            }
        );
    }

    #[test]
    fn test_acronym_title_is_not_an_author() {
        assert_eq!(
            classify_text("BERT | NAACL | 2019"),
            Query::TitleJournalYear {
                title: "BERT".to_string(),
                journal: "NAACL".to_string(),
                year: Some(2019),
            }
        );
    }

    #[test]
    fn test_two_segment_tie_treats_first_as_title() {
        // The second segment is too long to be a venue name.
        assert_eq!(
            classify_text("Deep residual learning | A very long description of the venue name here"),
            Query::TitleJournalYear {
                title: "Deep residual learning".to_string(),
                journal: "A very long description of the venue name here".to_string(),
                year: None,
            }
        );
    }

    #[test]
    fn test_author_title_journal_year() {
        assert_eq!(
            classify_text("Vaswani | Attention is all you need | NeurIPS | 2017"),
            Query::AuthorTitleJournalYear {
                author: "Vaswani".to_string(),
                title: "Attention is all you need".to_string(),
                journal: "NeurIPS".to_string(),
                year: Some(2017),
            }
        );
    }

    #[test]
    fn test_extra_segments_join_into_title() {
        assert_eq!(
            classify_text("Vaswani | Attention | is all you need | NeurIPS | 2017"),
            Query::AuthorTitleJournalYear {
                author: "Vaswani".to_string(),
                title: "Attention is all you need".to_string(),
                journal: "NeurIPS".to_string(),
                year: Some(2017),
            }
        );
    }

    #[test]
    fn test_garbage_falls_back_to_free_text() {
        for garbage in ["###garbage###", "|||", "2019", "Title | ---"] {
            assert_eq!(
                classify_text(garbage),
                Query::FreeText {
                    text: garbage.to_string()
                },
                "input {garbage:?}"
            );
        }
    }

    #[test]
    fn test_author_heuristics() {
        assert!(looks_like_author("Hinton"));
        assert!(looks_like_author("Hinton, G."));
        assert!(looks_like_author("Geoffrey Hinton"));
        assert!(!looks_like_author("BERT"));
        assert!(!looks_like_author("Attention is all you need"));
        assert!(!looks_like_author("Smith 2020"));
        assert!(!looks_like_author("Nets of the future"));
    }

    #[test]
    fn test_journal_heuristics() {
        assert!(looks_like_journal("Nature"));
        assert!(looks_like_journal("Proceedings of the National Academy of Sciences of the USA"));
        assert!(looks_like_journal("J. Chem. Phys."));
        assert!(!looks_like_journal("A very long description of the venue name here"));
    }

    #[test]
    fn test_line_key() {
        assert_eq!(
            line_key("https://doi.org/10.1038/NATURE12345"),
            line_key("10.1038/nature12345")
        );
        assert_eq!(
            line_key("Attention is all you need | 2017"),
            line_key("attention is all you need, 2017")
        );
        assert_ne!(line_key("Deep learning"), line_key("Deep learning | 2015"));
    }
}
