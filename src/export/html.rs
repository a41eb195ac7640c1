//! Standalone HTML output.

use std::fmt::Write;

use super::{render_entry, ExportOptions, Markup, DOCUMENT_TITLE};
use crate::format::FormattedCitation;

const STYLESHEET: &str = "\
    body {
      font-family: Georgia, \"Times New Roman\", serif;
      font-size: 14px;
      line-height: 1.8;
      max-width: 860px;
      margin: 40px auto;
      padding: 0 24px;
      color: #1a1a1a;
      background: #fafafa;
    }
    h1 {
      font-size: 1.5em;
      border-bottom: 2px solid #333;
      padding-bottom: 6px;
      margin-bottom: 4px;
    }
    .meta {
      color: #666;
      font-size: 0.85em;
      margin-bottom: 28px;
      font-style: italic;
    }
    ul.references { list-style: none; padding-left: 0; }
    ul.references li { margin-bottom: 10px; }
    a { color: #1a5276; }
";

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escaped HTML with inline emphasis and DOI links
#[derive(Debug, Default, Clone, Copy)]
pub struct Html;

impl Markup for Html {
    fn text(&self, s: &str) -> String {
        escape_html(s)
    }

    fn emph(&self, content: String) -> String {
        format!("<em>{}</em>", content)
    }

    fn strong(&self, content: String) -> String {
        format!("<strong>{}</strong>", content)
    }

    fn link(&self, url: &str, content: String) -> String {
        format!("<a href=\"{}\">{}</a>", escape_html(url), content)
    }
}

/// A complete HTML document; citations carry their own numbers, so the
/// list is unstyled
pub(super) fn html_document(citations: &[FormattedCitation], options: &ExportOptions) -> String {
    let mut items = String::new();
    for citation in citations {
        // Writing to a String cannot fail
        let _ = writeln!(items, "    <li>{}</li>", render_entry(&Html, citation));
    }

    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
  <meta charset=\"UTF-8\">
  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">
  <title>{title} - {style}</title>
  <style>
{stylesheet}  </style>
</head>
<body>
  <h1>{title}</h1>
  <p class=\"meta\">{meta}</p>
  <ul class=\"references\">
{items}  </ul>
</body>
</html>
",
        title = DOCUMENT_TITLE,
        style = escape_html(options.style.label()),
        stylesheet = STYLESHEET,
        meta = escape_html(&options.meta_line()),
        items = items,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::{fixed_options, sample_citations};
    use crate::format::CitationStyle;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("Fish & <chips> \"O'Brien\""),
            "Fish &amp; &lt;chips&gt; &quot;O&#39;Brien&quot;"
        );
    }

    #[test]
    fn test_entry_markup() {
        let citations = sample_citations(CitationStyle::Nature);
        assert_eq!(
            render_entry(&Html, &citations[0]),
            "1. <strong>Hinton, G. E.</strong> &amp; Salakhutdinov, R. R. Reducing the \
             dimensionality of data with neural networks. <em>Science</em> \
             <strong>313</strong>, 504-507 (2006). \
             <a href=\"https://doi.org/10.1126/science.1127647\">\
             https://doi.org/10.1126/science.1127647</a>"
        );
        assert_eq!(
            render_entry(&Html, &citations[1]),
            "2. O&#39;Brien, S. Fish &amp; &lt;chips&gt;: a &quot;study&quot;. \
             <em>Journal of Food</em> (2019)."
        );
    }

    #[test]
    fn test_document_is_standalone() {
        let citations = sample_citations(CitationStyle::Apa);
        let output = html_document(&citations, &fixed_options(CitationStyle::Apa));
        assert!(output.starts_with("<!DOCTYPE html>"));
        assert!(output.contains("<title>References - APA 7th</title>"));
        assert!(output.contains("<h1>References</h1>"));
        assert_eq!(output.matches("<li>").count(), 2);
        assert!(output.trim_end().ends_with("</html>"));
        assert!(!output.contains("<chips>"));
    }
}
