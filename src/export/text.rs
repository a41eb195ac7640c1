//! Plain text and Markdown output.

use super::{render_entry, ExportOptions, Markup, DOCUMENT_TITLE};
use crate::format::FormattedCitation;

/// Text without any markup
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl Markup for PlainText {
    fn text(&self, s: &str) -> String {
        s.to_string()
    }

    fn emph(&self, content: String) -> String {
        content
    }

    fn strong(&self, content: String) -> String {
        content
    }

    fn link(&self, _url: &str, content: String) -> String {
        content
    }
}

/// Markdown emphasis; citation text is passed through unescaped
#[derive(Debug, Default, Clone, Copy)]
pub struct Markdown;

impl Markup for Markdown {
    fn text(&self, s: &str) -> String {
        s.to_string()
    }

    fn emph(&self, content: String) -> String {
        if content.is_empty() {
            return content;
        }
        format!("*{}*", content)
    }

    fn strong(&self, content: String) -> String {
        if content.is_empty() {
            return content;
        }
        format!("**{}**", content)
    }

    fn link(&self, _url: &str, content: String) -> String {
        content
    }
}

/// One citation per line
pub(super) fn plain_document(citations: &[FormattedCitation]) -> String {
    let mut out = String::new();
    for citation in citations {
        out.push_str(&render_entry(&PlainText, citation));
        out.push('\n');
    }
    out
}

/// Heading, meta line, then one paragraph per citation
pub(super) fn markdown_document(citations: &[FormattedCitation], options: &ExportOptions) -> String {
    let mut lines = vec![
        format!("# {}", DOCUMENT_TITLE),
        String::new(),
        format!("*{}*", options.meta_line()),
        String::new(),
    ];
    for citation in citations {
        lines.push(render_entry(&Markdown, citation));
        lines.push(String::new());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::{fixed_options, sample_citations};
    use crate::format::CitationStyle;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_document_has_no_markup() {
        let citations = sample_citations(CitationStyle::Nature);
        let output = plain_document(&citations);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], citations[0].text());
        assert!(!output.contains('*'));
    }

    #[test]
    fn test_markdown_document() {
        let citations = sample_citations(CitationStyle::Nature);
        let output = markdown_document(&citations, &fixed_options(CitationStyle::Nature));
        assert_eq!(
            output,
            "# References\n\
             \n\
             *Citation style: Nature - generated 2024-05-01 09:30*\n\
             \n\
             1. **Hinton, G. E.** & Salakhutdinov, R. R. Reducing the dimensionality of data \
             with neural networks. *Science* **313**, 504-507 (2006). \
             https://doi.org/10.1126/science.1127647\n\
             \n\
             2. O'Brien, S. Fish & <chips>: a \"study\". *Journal of Food* (2019).\n"
        );
    }
}
