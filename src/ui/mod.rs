//! Terminal presentation for the CLI: status lines, lookup progress and
//! summary tables.
//!
//! Everything here writes to stderr, so citations on stdout stay clean for
//! piping.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::format::CitationStyle;
use crate::models::{NormalizedRecord, Query, RawLine};
use crate::pipeline::{FailureKind, LineFailure, RunObserver, RunReport};
use crate::sources::SourceError;

/// Check if stderr is a terminal.
pub fn is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

/// Status icons for different outcomes.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// A status message with a colored icon
pub fn status_line(status: Status, msg: &str) -> String {
    let icon = status_icon(status);
    match status {
        Status::Success => format!("{} {}", icon.green().bold(), msg),
        Status::Error => format!("{} {}", icon.red().bold(), msg),
        Status::Warning => format!("{} {}", icon.yellow().bold(), msg),
        Status::Info => format!("{} {}", icon.cyan().bold(), msg),
    }
}

/// Print a styled status message to stderr.
pub fn print_status(status: Status, msg: &str) {
    eprintln!("{}", status_line(status, msg));
}

/// Truncate text to at most `max_chars` characters, marking the cut with "..."
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return "...".to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept)
}

/// Progress bar over the lookups of one run
pub struct LookupProgress {
    pb: ProgressBar,
}

impl LookupProgress {
    /// A visible bar, or a hidden one when `enabled` is false or stderr is
    /// not a terminal
    pub fn new(enabled: bool) -> Self {
        let pb = if enabled && is_terminal() {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} Looking up {bar:30.cyan/blue} {pos}/{len} {wide_msg:.dim}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .progress_chars("█▓▒░ "),
        );
        Self { pb }
    }
}

impl RunObserver for LookupProgress {
    fn on_start(&self, lookups: usize) {
        self.pb.set_length(lookups as u64);
        self.pb.enable_steady_tick(Duration::from_millis(100));
    }

    fn on_resolved(&self, line: &RawLine, result: Result<&NormalizedRecord, &SourceError>) {
        let msg = match result {
            Ok(record) => format!("line {}: {}", line.number, record.primary_id()),
            Err(_) => format!("line {}: failed", line.number),
        };
        self.pb.set_message(truncate_with_ellipsis(&msg, 60));
        self.pb.inc(1);
    }

    fn on_finish(&self, _report: &RunReport) {
        self.pb.finish_and_clear();
    }
}

fn failure_color(kind: FailureKind) -> Color {
    match kind {
        FailureKind::NotFound => Color::Yellow,
        FailureKind::Transport => Color::Red,
        FailureKind::InvalidResponse => Color::Magenta,
    }
}

/// Table of lines that produced no citation
pub fn failure_table(failures: &[LineFailure]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Line", "Input", "Problem", "Reason"]);

    for failure in failures {
        table.add_row(vec![
            Cell::new(failure.line),
            Cell::new(truncate_with_ellipsis(&failure.text, 50)),
            Cell::new(failure.kind.label()).fg(failure_color(failure.kind)),
            Cell::new(truncate_with_ellipsis(&failure.reason, 60)),
        ]);
    }
    table
}

/// Table of the supported citation styles, in menu order
pub fn styles_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_header(vec!["#", "Name", "Style", "Also accepted"]);

    for style in CitationStyle::ALL {
        table.add_row(vec![
            Cell::new(style.menu_number()),
            Cell::new(style.key()).add_attribute(Attribute::Bold),
            Cell::new(style.label()),
            Cell::new(style.aliases().join(", ")),
        ]);
    }
    table
}

/// Table of the query shape detected for each line
pub fn detection_table(rows: &[(RawLine, Query)]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Line", "Input", "Detected as", "Query"]);

    for (line, query) in rows {
        table.add_row(vec![
            Cell::new(line.number),
            Cell::new(truncate_with_ellipsis(&line.text, 50)),
            Cell::new(query.kind()).fg(Color::Cyan),
            Cell::new(query.to_string()),
        ]);
    }
    table
}

/// Print the end-of-run summary: counts, then any failures
pub fn print_summary(report: &RunReport) {
    let resolved = report.entries.len();
    let total = report.total_lines();

    if report.cancelled {
        print_status(
            Status::Warning,
            &format!(
                "Cancelled: {} of {} line(s) resolved, {} not processed",
                resolved,
                total,
                report.unprocessed.len()
            ),
        );
    } else if report.failures.is_empty() {
        print_status(
            Status::Success,
            &format!("Resolved {} of {} line(s)", resolved, total),
        );
    } else {
        print_status(
            Status::Warning,
            &format!(
                "Resolved {} of {} line(s), {} failed",
                resolved,
                total,
                report.failures.len()
            ),
        );
    }

    if !report.duplicates.is_empty() {
        let lines: Vec<String> = report
            .duplicates
            .iter()
            .map(|d| format!("{} (= {})", d.line.number, d.duplicate_of))
            .collect();
        print_status(
            Status::Info,
            &format!("Skipped duplicate line(s): {}", lines.join(", ")),
        );
    }

    if !report.failures.is_empty() {
        eprintln!("{}", failure_table(&report.failures));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::classify;

    #[test]
    fn test_status_icon() {
        assert_eq!(status_icon(Status::Success), "✓");
        assert_eq!(status_icon(Status::Error), "✗");
        assert!(status_line(Status::Info, "hello").ends_with("hello"));
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("Hello", 10), "Hello");
        assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
        assert_eq!(truncate_with_ellipsis("Hello", 3), "...");
        assert_eq!(truncate_with_ellipsis("Ölçüm verisi", 6), "Ölç...");
    }

    #[test]
    fn test_failure_table_lists_every_failure() {
        let failures = vec![
            LineFailure {
                line: 2,
                text: "###garbage###".to_string(),
                kind: FailureKind::NotFound,
                reason: "Not found: no results".to_string(),
            },
            LineFailure {
                line: 5,
                text: "10.1000/xyz".to_string(),
                kind: FailureKind::Transport,
                reason: "Server error: HTTP 503".to_string(),
            },
        ];
        let rendered = failure_table(&failures).to_string();
        assert!(rendered.contains("###garbage###"));
        assert!(rendered.contains("HTTP 503"));
        assert!(rendered.contains("lookup error"));
    }

    #[test]
    fn test_styles_table_has_every_style() {
        let rendered = styles_table().to_string();
        for style in CitationStyle::ALL {
            assert!(rendered.contains(style.key()), "{}", style.key());
        }
    }

    #[test]
    fn test_detection_table() {
        let line = RawLine::new(1, "10.1038/nature14539");
        let query = classify(&line);
        let rendered = detection_table(&[(line, query.clone())]).to_string();
        assert!(rendered.contains(query.kind()));
    }

    #[test]
    fn test_hidden_progress_accepts_events() {
        let progress = LookupProgress::new(false);
        progress.on_start(1);
        progress.on_resolved(
            &RawLine::new(1, "x"),
            Err(&SourceError::NotFound("x".to_string())),
        );
        progress.on_finish(&RunReport::default());
    }
}
