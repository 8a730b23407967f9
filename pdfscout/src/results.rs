/// Value types that flow out of a search.
///
/// Everything here is produced once and never mutated afterwards: a worker
/// builds a [`FileOutcome`] for its [`FileTask`], hands it to the scheduler, and
/// from then on the aggregator owns it. The only incrementally built value is the
/// [`SearchReport`], and only the scheduler writes to it.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{EnumerationError, FileError, PageError, SearchResult};

/// One discovered document, consumed exactly once by a worker
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileTask {
    path: PathBuf,
}

impl FileTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A single hit on a single page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// The document containing the match
    pub path: PathBuf,
    /// 1-based page number
    pub page: usize,
    /// Byte offset of the match within the page text
    pub offset: usize,
    /// The matched text
    pub matched: String,
    /// Verbatim window of page text around the match
    pub snippet: String,
    /// Whether the page text came from OCR rather than the native layer
    pub used_ocr: bool,
}

impl PageResult {
    /// The snippet with whitespace runs collapsed, for one-line rendering
    pub fn display_snippet(&self) -> String {
        self.snippet.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Everything found in one document that opened successfully
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatches {
    pub path: PathBuf,
    /// Pages in the document
    pub pages: usize,
    /// Pages whose text came from OCR
    pub ocr_pages: usize,
    /// Matches in page order, then offset order
    pub results: Vec<PageResult>,
    /// Pages that failed without sinking the whole file
    pub degraded_pages: Vec<PageError>,
}

/// The single result of processing one [`FileTask`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Searched(FileMatches),
    Failed(FileError),
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Searched(found) => &found.path,
            FileOutcome::Failed(err) => &err.path,
        }
    }

    pub fn match_count(&self) -> usize {
        match self {
            FileOutcome::Searched(found) => found.results.len(),
            FileOutcome::Failed(_) => 0,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FileOutcome::Failed(_))
    }
}

/// Emitted after every completed file, in completion order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub files_done: usize,
    pub files_total: usize,
    pub matches_so_far: usize,
    /// The file whose completion produced this event
    pub current_file: Option<PathBuf>,
}

/// What a running session yields, ending with exactly one `Finished`
#[derive(Debug, Clone)]
pub enum SearchEvent {
    Progress(Progress),
    Finished(SearchReport),
}

/// The terminal summary of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReport {
    /// Files discovered under the root
    pub files_total: usize,
    /// Files that completed, successfully or not
    pub files_scanned: usize,
    /// Files that completed with a [`FileError`]
    pub files_errored: usize,
    /// Total number of matches found
    pub total_matches: usize,
    /// Pages read across all successfully opened files
    pub pages_scanned: usize,
    /// Pages whose text came from OCR
    pub ocr_pages: usize,
    /// Matches ordered by file enumeration order, then page, then offset
    pub matches: Vec<PageResult>,
    /// One entry per failed file, in enumeration order
    pub errors: Vec<FileError>,
    /// Degraded pages inside files that otherwise succeeded
    pub page_errors: Vec<PageError>,
    /// Directory entries that could not be walked
    pub enumeration_error: Option<EnumerationError>,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl SearchReport {
    /// Creates an empty report for a run over `files_total` files
    pub fn new(files_total: usize) -> Self {
        Self {
            files_total,
            ..Default::default()
        }
    }

    /// Adds a completed file to the report.
    ///
    /// Callers add outcomes in enumeration order; the report keeps that order.
    pub fn add_outcome(&mut self, outcome: FileOutcome) {
        self.files_scanned += 1;
        match outcome {
            FileOutcome::Searched(found) => {
                self.total_matches += found.results.len();
                self.pages_scanned += found.pages;
                self.ocr_pages += found.ocr_pages;
                self.matches.extend(found.results);
                self.page_errors.extend(found.degraded_pages);
            }
            FileOutcome::Failed(err) => {
                self.files_errored += 1;
                self.errors.push(err);
            }
        }
    }

    /// Number of files that produced at least one match
    pub fn files_with_matches(&self) -> usize {
        let mut count = 0;
        let mut last: Option<&Path> = None;
        for m in &self.matches {
            if last != Some(m.path.as_path()) {
                count += 1;
                last = Some(m.path.as_path());
            }
        }
        count
    }

    /// Serializes the report as pretty-printed JSON
    pub fn to_json(&self) -> SearchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Whole milliseconds keep the summary readable
        let elapsed = Duration::from_millis(self.elapsed.as_millis() as u64);
        write!(
            f,
            "Found {} matches in {} of {} files ({} pages, {} via OCR) in {}",
            self.total_matches,
            self.files_with_matches(),
            self.files_scanned,
            self.pages_scanned,
            self.ocr_pages,
            humantime::format_duration(elapsed)
        )?;
        if self.files_errored > 0 {
            write!(f, ", {} files failed", self.files_errored)?;
        }
        if self.cancelled {
            write!(f, " (cancelled after {} of {} files)", self.files_scanned, self.files_total)?;
        }
        Ok(())
    }
}
