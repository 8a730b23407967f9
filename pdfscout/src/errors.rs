/// Error types for pdfscout.
///
/// Errors come in three granularities and each one travels differently:
///
/// 1. [`SearchError`] is configuration level. A bad pattern or an unusable root
///    directory fails the whole session before any file is opened.
/// 2. [`FileError`] belongs to a single document. It is recorded in the final
///    report and the run carries on with the remaining files.
/// 3. [`PageError`] belongs to a single page. It only reduces that page's
///    contribution to zero matches, unless every page of the file failed, in
///    which case it is rolled up into a [`FileError`].
///
/// ```rust,ignore
/// match SearchSession::new(config) {
///     Ok(session) => { let report = session.run(|_| {}); }
///     Err(SearchError::InvalidPattern(msg)) => eprintln!("bad pattern: {msg}"),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for configuration-level operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that abort a search session before any work is dispatched
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search pattern is empty")]
    EmptyPattern,
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Invalid root directory: {0}")]
    InvalidRoot(PathBuf),
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SearchError {
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    pub fn invalid_root(path: impl Into<PathBuf>) -> Self {
        Self::InvalidRoot(path.into())
    }
}

/// Why a whole document could not be searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorKind {
    /// The file could not be read from disk (missing, permissions, I/O)
    Unreadable,
    /// The document is encrypted and cannot be opened without a password
    Encrypted,
    /// The document failed to parse, or every page failed to extract
    Corrupt,
    /// OCR was requested for the document's pages but no engine could run
    OcrUnavailable,
}

impl fmt::Display for FileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileErrorKind::Unreadable => "unreadable",
            FileErrorKind::Encrypted => "encrypted",
            FileErrorKind::Corrupt => "corrupt",
            FileErrorKind::OcrUnavailable => "OCR unavailable",
        };
        f.write_str(label)
    }
}

/// A per-document failure, recorded in the report without stopping the run
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{}: {kind}: {reason}", .path.display())]
pub struct FileError {
    pub path: PathBuf,
    pub kind: FileErrorKind,
    pub reason: String,
}

impl FileError {
    pub fn new(path: impl Into<PathBuf>, kind: FileErrorKind, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            reason: reason.into(),
        }
    }

    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::new(path, FileErrorKind::Unreadable, reason)
    }

    pub fn encrypted(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileErrorKind::Encrypted, "document is password protected")
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::new(path, FileErrorKind::Corrupt, reason)
    }

    /// Maps an I/O failure on open to the matching kind
    pub fn from_io(path: &Path, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::unreadable(path, "file not found"),
            std::io::ErrorKind::PermissionDenied => Self::unreadable(path, "permission denied"),
            _ => Self::unreadable(path, err.to_string()),
        }
    }
}

/// Why a single page contributed no text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageErrorKind {
    /// The native text layer could not be decoded
    Extraction,
    /// The page could not be rasterized for OCR
    Render,
    /// No OCR engine is installed or it could not be started
    OcrUnavailable,
    /// The OCR engine ran but failed
    Recognition,
}

impl fmt::Display for PageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PageErrorKind::Extraction => "text extraction failed",
            PageErrorKind::Render => "render failed",
            PageErrorKind::OcrUnavailable => "OCR unavailable",
            PageErrorKind::Recognition => "OCR failed",
        };
        f.write_str(label)
    }
}

/// A degraded page inside an otherwise readable document
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{} page {page}: {kind}: {reason}", .path.display())]
pub struct PageError {
    pub path: PathBuf,
    /// 1-based page number
    pub page: usize,
    pub kind: PageErrorKind,
    pub reason: String,
}

impl PageError {
    pub fn new(
        path: impl Into<PathBuf>,
        page: usize,
        kind: PageErrorKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            page,
            kind,
            reason: reason.into(),
        }
    }
}

/// Directory entries the enumerator could not read, reported once per session
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{} entries could not be read during enumeration", .failures.len())]
pub struct EnumerationError {
    pub failures: Vec<String>,
}

impl EnumerationError {
    pub fn record(slot: &mut Option<EnumerationError>, failure: impl Into<String>) {
        slot.get_or_insert_with(|| EnumerationError {
            failures: Vec::new(),
        })
        .failures
        .push(failure.into());
    }
}

/// Failures from the rasterize + recognize pipeline
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR unavailable: {0}")]
    Unavailable(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("recognition failed: {0}")]
    Recognition(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    pub fn page_error_kind(&self) -> PageErrorKind {
        match self {
            OcrError::Unavailable(_) => PageErrorKind::OcrUnavailable,
            OcrError::Render(_) => PageErrorKind::Render,
            OcrError::Recognition(_) | OcrError::Io(_) => PageErrorKind::Recognition,
        }
    }
}

/// Canonicalize the path and strip UNC prefixes so that
/// comparisons on Windows are consistent.
pub fn unify_path(original: &Path) -> PathBuf {
    let canonical = original
        .canonicalize()
        .unwrap_or_else(|_| original.to_path_buf());
    strip_unc_prefix(&canonical)
}

/// Strips the Windows UNC prefix (\\?\) from a path if present
fn strip_unc_prefix(p: &Path) -> PathBuf {
    let s = p.display().to_string();
    if let Some(stripped) = s.strip_prefix(r"\\?\") {
        PathBuf::from(stripped)
    } else {
        p.to_path_buf()
    }
}
