//! Export of formatted citations to plain text, Markdown, HTML and PDF.
//!
//! Exporters only serialize: every citation arrives as styled segments and
//! is written in order, one entry each. Text formats share the [`Markup`]
//! trait; PDF lays the same segments out on pages itself.

mod html;
mod pdf;
mod text;

pub use html::Html;
pub use text::{Markdown, PlainText};

use chrono::{DateTime, Local};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::format::{CitationStyle, Emphasis, FormattedCitation, SegmentKind};

/// Heading written at the top of every document format
pub const DOCUMENT_TITLE: &str = "References";

/// Supported output containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Plain,
    Markdown,
    Html,
    Pdf,
}

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unknown export format '{0}' (expected text, markdown, html or pdf)")]
    UnknownFormat(String),

    #[error("Cannot infer an export format from '{}'", .0.display())]
    UnknownExtension(PathBuf),

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Failed to write {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Plain,
        ExportFormat::Markdown,
        ExportFormat::Html,
        ExportFormat::Pdf,
    ];

    /// Usual file extension
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Plain => "txt",
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .ok_or_else(|| ExportError::UnknownExtension(path.to_path_buf()))
    }

    /// Whether the format is binary and unsuitable for a terminal
    pub fn is_binary(&self) -> bool {
        matches!(self, ExportFormat::Pdf)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Plain => "text",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" | "plain" | "console" => Ok(ExportFormat::Plain),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "html" | "htm" => Ok(ExportFormat::Html),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(ExportError::UnknownFormat(s.trim().to_string())),
        }
    }
}

/// Document-level details shared by every entry
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub style: CitationStyle,
    pub generated_at: DateTime<Local>,
}

impl ExportOptions {
    pub fn new(style: CitationStyle) -> Self {
        Self {
            style,
            generated_at: Local::now(),
        }
    }

    /// Line naming the style and generation time
    pub fn meta_line(&self) -> String {
        format!(
            "Citation style: {} - generated {}",
            self.style.label(),
            self.generated_at.format("%Y-%m-%d %H:%M")
        )
    }
}

/// How a text format marks up citation segments
pub trait Markup {
    /// Escape raw text for the format
    fn text(&self, s: &str) -> String;

    /// Italic content
    fn emph(&self, content: String) -> String;

    /// Bold content
    fn strong(&self, content: String) -> String;

    /// A highlighted author name
    fn highlight(&self, content: String) -> String {
        self.strong(content)
    }

    /// Hyperlinked content
    fn link(&self, url: &str, content: String) -> String;
}

/// Render one citation through `markup`
pub fn render_entry<M: Markup>(markup: &M, citation: &FormattedCitation) -> String {
    citation
        .segments
        .iter()
        .map(|segment| {
            let mut out = markup.text(&segment.text);
            out = match segment.emphasis {
                Some(Emphasis::Italic) => markup.emph(out),
                Some(Emphasis::Bold) => markup.strong(out),
                None => out,
            };
            if segment.highlighted {
                out = markup.highlight(out);
            }
            if let SegmentKind::Link { url } = &segment.kind {
                out = markup.link(url, out);
            }
            out
        })
        .collect()
}

/// Serialize `citations` into a complete document
pub fn render(
    citations: &[FormattedCitation],
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    let bytes = match format {
        ExportFormat::Plain => text::plain_document(citations).into_bytes(),
        ExportFormat::Markdown => text::markdown_document(citations, options).into_bytes(),
        ExportFormat::Html => html::html_document(citations, options).into_bytes(),
        ExportFormat::Pdf => pdf::pdf_document(citations, options)?,
    };
    tracing::debug!(
        "Rendered {} citation(s) as {} ({} bytes)",
        citations.len(),
        format,
        bytes.len()
    );
    Ok(bytes)
}

/// Write `bytes` to `path` atomically: the file either keeps its previous
/// content or holds all of `bytes`
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let write_error = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(bytes).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;
    file.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

/// Render `citations` and write them to `path`
pub fn export_to_path(
    citations: &[FormattedCitation],
    format: ExportFormat,
    options: &ExportOptions,
    path: &Path,
) -> Result<(), ExportError> {
    let bytes = render(citations, format, options)?;
    write_atomic(path, &bytes)?;
    tracing::info!(
        "Wrote {} citation(s) to {}",
        citations.len(),
        path.display()
    );
    Ok(())
}
