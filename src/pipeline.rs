//! Batch pipeline: classify input lines, resolve them with bounded
//! concurrency, then drop repeated works.
//!
//! Lookups complete in any order; each result lands in the slot of the line
//! that asked for it, so the report always follows input order.

use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::format::{format_list, AuthorHighlighter, CitationStyle, FormattedCitation};
use crate::input::{classify, line_key, parse_lines};
use crate::models::{NormalizedRecord, Query, RawLine};
use crate::sources::{CachedSource, CrossRefSource, LookupSource, SourceError};
use crate::utils::{find_duplicates, CacheService};

/// Tuning for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Lookups in flight at once (at least one)
    pub max_concurrent: usize,
    /// Skip lines whose normalized text repeats an earlier line
    pub skip_duplicate_lines: bool,
    /// Search results requested per fuzzy query
    pub search_rows: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            skip_duplicate_lines: true,
            search_rows: 3,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent: config.pipeline.max_concurrent.max(1),
            skip_duplicate_lines: config.pipeline.skip_duplicate_lines,
            search_rows: config.lookup.search_rows.max(1),
        }
    }
}

/// Why a line produced no citation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service has no citable work for the line
    NotFound,
    /// The service could not be reached or kept failing
    Transport,
    /// The service answered with something unreadable
    InvalidResponse,
}

impl FailureKind {
    pub fn from_error(err: &SourceError) -> Self {
        match err {
            SourceError::NotFound(_) | SourceError::InvalidRequest(_) => FailureKind::NotFound,
            SourceError::Parse(_) => FailureKind::InvalidResponse,
            SourceError::Network(_)
            | SourceError::Timeout(_)
            | SourceError::RateLimit(_)
            | SourceError::Server(_)
            | SourceError::Api { .. }
            | SourceError::Io(_) => FailureKind::Transport,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "not found",
            FailureKind::Transport => "lookup error",
            FailureKind::InvalidResponse => "invalid response",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A line that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFailure {
    /// 1-based input line number
    pub line: usize,
    pub text: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// A line resolved to a record
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
    pub line: RawLine,
    pub query: Query,
    pub record: Arc<NormalizedRecord>,
}

/// A line dropped because it repeats an earlier one, either textually or by
/// resolving to the same work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateLine {
    pub line: RawLine,
    /// Line number of the kept original
    pub duplicate_of: usize,
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Unique resolved works, in input order
    pub entries: Vec<ResolvedEntry>,
    pub duplicates: Vec<DuplicateLine>,
    pub failures: Vec<LineFailure>,
    /// Lines never looked up because the run was cancelled
    pub unprocessed: Vec<RawLine>,
    pub cancelled: bool,
}

impl RunReport {
    /// Whether every line was resolved or recognized as a duplicate
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Number of input lines the report accounts for
    pub fn total_lines(&self) -> usize {
        self.entries.len() + self.duplicates.len() + self.failures.len() + self.unprocessed.len()
    }

    /// Resolved records, in input order
    pub fn records(&self) -> impl Iterator<Item = &Arc<NormalizedRecord>> {
        self.entries.iter().map(|entry| &entry.record)
    }

    /// Format every resolved record as a citation list
    pub fn citations(
        &self,
        style: CitationStyle,
        numbered: bool,
        highlighter: Option<&AuthorHighlighter>,
    ) -> Vec<FormattedCitation> {
        format_list(self.records(), style, numbered, highlighter)
    }
}

/// Progress callbacks for a run; every method defaults to doing nothing
pub trait RunObserver: Send + Sync {
    /// Called once with the number of lookups about to start
    fn on_start(&self, _lookups: usize) {}

    /// Called as each lookup completes, in completion order
    fn on_resolved(&self, _line: &RawLine, _result: Result<&NormalizedRecord, &SourceError>) {}

    /// Called once the report is assembled
    fn on_finish(&self, _report: &RunReport) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Classify → lookup → dedup over a batch of lines
#[derive(Debug, Clone)]
pub struct Pipeline {
    source: Arc<dyn LookupSource>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(source: Arc<dyn LookupSource>, options: PipelineOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run over raw input text, one reference per line
    pub async fn run(
        &self,
        input: &str,
        cancel: &CancellationToken,
        observer: &dyn RunObserver,
    ) -> RunReport {
        self.run_lines(parse_lines(input), cancel, observer).await
    }

    /// Run over already-split lines
    pub async fn run_lines(
        &self,
        lines: Vec<RawLine>,
        cancel: &CancellationToken,
        observer: &dyn RunObserver,
    ) -> RunReport {
        let mut report = RunReport::default();

        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut work: Vec<(RawLine, Query)> = Vec::with_capacity(lines.len());
        for line in lines {
            if self.options.skip_duplicate_lines {
                let key = line_key(&line.text);
                if let Some(&first) = seen.get(&key) {
                    tracing::debug!("Line {} repeats line {}", line.number, first);
                    report.duplicates.push(DuplicateLine {
                        line,
                        duplicate_of: first,
                    });
                    continue;
                }
                seen.insert(key, line.number);
            }
            let query = classify(&line);
            tracing::debug!("Line {}: {}", line.number, query);
            work.push((line, query));
        }

        observer.on_start(work.len());
        let mut slots: Vec<Option<Result<NormalizedRecord, SourceError>>> =
            (0..work.len()).map(|_| None).collect();

        let source = &self.source;
        let rows = self.options.search_rows;
        let mut lookups = stream::iter(work.iter().enumerate())
            .map(|(index, (_, query))| async move { (index, source.resolve(query, rows).await) })
            .buffer_unordered(self.options.max_concurrent.max(1));

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!("Run cancelled; in-flight lookups dropped");
                    report.cancelled = true;
                    break;
                }
                next = lookups.next() => match next {
                    Some((index, result)) => {
                        observer.on_resolved(&work[index].0, result.as_ref());
                        slots[index] = Some(result);
                    }
                    None => break,
                },
            }
        }
        drop(lookups);

        let mut entries = Vec::new();
        for ((line, query), slot) in work.into_iter().zip(slots) {
            match slot {
                Some(Ok(record)) => entries.push(ResolvedEntry {
                    line,
                    query,
                    record: Arc::new(record),
                }),
                Some(Err(err)) => {
                    tracing::debug!("Line {} failed: {}", line.number, err);
                    report.failures.push(LineFailure {
                        line: line.number,
                        text: line.text,
                        kind: FailureKind::from_error(&err),
                        reason: err.to_string(),
                    });
                }
                None => report.unprocessed.push(line),
            }
        }

        let records: Vec<&NormalizedRecord> = entries.iter().map(|e| e.record.as_ref()).collect();
        let mut repeats = find_duplicates(&records).into_iter().peekable();
        let line_numbers: Vec<usize> = entries.iter().map(|e| e.line.number).collect();

        for (index, entry) in entries.into_iter().enumerate() {
            match repeats.next_if(|d| d.index == index) {
                Some(duplicate) => {
                    tracing::debug!(
                        "Line {} resolves to the same work as line {}",
                        entry.line.number,
                        line_numbers[duplicate.original]
                    );
                    report.duplicates.push(DuplicateLine {
                        line: entry.line,
                        duplicate_of: line_numbers[duplicate.original],
                    });
                }
                None => report.entries.push(entry),
            }
        }
        report.duplicates.sort_by_key(|d| d.line.number);

        tracing::info!(
            "Resolved {} of {} line(s): {} duplicate(s), {} failure(s), {} unprocessed",
            report.entries.len(),
            report.total_lines(),
            report.duplicates.len(),
            report.failures.len(),
            report.unprocessed.len()
        );
        observer.on_finish(&report);
        report
    }
}

/// Build the Crossref source described by `config`, cached unless caching
/// is disabled
pub fn build_source(config: &Config, no_cache: bool) -> Result<Arc<dyn LookupSource>, SourceError> {
    let crossref = CrossRefSource::new(&config.lookup, config.retry.to_retry_config())?;
    let cache = CacheService::from_config(&config.cache);
    if no_cache || !cache.is_enabled() {
        tracing::debug!("Lookup cache disabled");
        return Ok(Arc::new(crossref));
    }
    tracing::debug!("Lookup cache at {}", cache.cache_dir().display());
    Ok(Arc::new(CachedSource::new(crossref, cache)))
}
