use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

use super::matcher::PatternMatcher;
use crate::config::SearchConfig;
use crate::errors::{FileError, FileErrorKind, PageError, PageErrorKind};
use crate::metrics::SearchMetrics;
use crate::ocr::OcrTextSource;
use crate::pdf::{PdfBackend, PdfDocument};
use crate::results::{FileMatches, FileOutcome, FileTask, PageResult};

/// Number of characters that are not whitespace
pub fn visible_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Where the searchable text of a page comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    /// The native text layer is good enough
    Native,
    /// The native layer is too sparse and OCR is enabled
    Ocr,
    /// Nothing to search on this page
    Skip,
}

impl TextSource {
    /// Chooses a source from the native text of a page.
    ///
    /// A page is sparse when it has fewer than `min_chars` visible characters.
    /// Sparse text is still searched when OCR is off, as long as it is not blank.
    pub fn decide(native: &str, include_ocr: bool, min_chars: usize) -> Self {
        let visible = visible_chars(native);
        if visible >= min_chars.max(1) {
            TextSource::Native
        } else if include_ocr {
            TextSource::Ocr
        } else if visible > 0 {
            TextSource::Native
        } else {
            TextSource::Skip
        }
    }
}

/// Text picked for one page, before matching
enum PageText {
    Text {
        text: String,
        used_ocr: bool,
        degraded: Option<PageError>,
    },
    Blank,
    Failed(PageError),
}

/// Searches a single PDF, page by page
pub struct FileProcessor {
    matcher: PatternMatcher,
    backend: Arc<dyn PdfBackend>,
    ocr: OcrTextSource,
    include_ocr: bool,
    ocr_dpi: u32,
    ocr_min_chars: usize,
    metrics: SearchMetrics,
}

impl std::fmt::Debug for FileProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileProcessor")
            .field("pattern", &self.matcher.pattern().source())
            .field("ocr", &self.ocr)
            .field("include_ocr", &self.include_ocr)
            .field("ocr_dpi", &self.ocr_dpi)
            .finish()
    }
}

impl FileProcessor {
    /// Creates a processor that applies `matcher` with the OCR settings of `config`
    pub fn new(
        matcher: PatternMatcher,
        backend: Arc<dyn PdfBackend>,
        ocr: OcrTextSource,
        config: &SearchConfig,
    ) -> Self {
        Self {
            matcher,
            backend,
            ocr,
            include_ocr: config.include_ocr,
            ocr_dpi: config.ocr_dpi.get(),
            ocr_min_chars: config.ocr_min_chars,
            metrics: SearchMetrics::new(),
        }
    }

    /// Gets the page metrics shared by every clone of this processor's counters
    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    /// Searches every page of the task's document.
    ///
    /// Never panics on bad input: an unopenable document yields
    /// [`FileOutcome::Failed`], a bad page is recorded as degraded and skipped.
    /// The document handle is dropped before returning.
    pub fn process(&self, task: &FileTask) -> FileOutcome {
        let path = task.path();
        trace!("Processing file: {}", path.display());

        let document = match self.backend.open(path) {
            Ok(document) => document,
            Err(err) => {
                warn!("Skipping {}: {}", path.display(), err.reason);
                self.metrics.record_file_failed();
                return FileOutcome::Failed(err);
            }
        };
        self.metrics.record_file_opened();

        let pages = document.page_count();
        let mut found = FileMatches {
            path: path.to_path_buf(),
            pages,
            ..Default::default()
        };
        let mut failures: Vec<PageError> = Vec::new();

        for page_index in 0..pages {
            match self.page_text(document.as_ref(), path, page_index) {
                PageText::Text {
                    text,
                    used_ocr,
                    degraded,
                } => {
                    if used_ocr {
                        found.ocr_pages += 1;
                    }
                    if let Some(err) = degraded {
                        self.metrics.record_degraded_page();
                        found.degraded_pages.push(err);
                    }
                    found.results.extend(self.matcher.find(&text).into_iter().map(|m| {
                        PageResult {
                            path: path.to_path_buf(),
                            page: page_index + 1,
                            offset: m.offset,
                            matched: m.matched,
                            snippet: m.snippet,
                            used_ocr,
                        }
                    }));
                }
                PageText::Blank => {}
                PageText::Failed(err) => {
                    debug!("{}", err);
                    self.metrics.record_degraded_page();
                    failures.push(err);
                }
            }
        }
        drop(document);

        if pages > 0 && failures.len() == pages {
            self.metrics.record_file_failed();
            return FileOutcome::Failed(roll_up(path, &failures));
        }

        trace!(
            "Found {} matches across {} pages in {}",
            found.results.len(),
            pages,
            path.display()
        );
        found.degraded_pages.extend(failures);
        found.degraded_pages.sort_by_key(|err| err.page);
        FileOutcome::Searched(found)
    }

    fn page_text(&self, document: &dyn PdfDocument, path: &Path, page_index: usize) -> PageText {
        let (native, native_err) = match document.page_text(page_index) {
            Ok(text) => (text, None),
            Err(err) => (String::new(), Some(err)),
        };

        if let Some(err) = native_err {
            if !self.include_ocr {
                return PageText::Failed(err);
            }
            debug!("{}; trying OCR", err);
        }

        match TextSource::decide(&native, self.include_ocr, self.ocr_min_chars) {
            TextSource::Native => {
                self.metrics.record_native_page();
                PageText::Text {
                    text: native,
                    used_ocr: false,
                    degraded: None,
                }
            }
            TextSource::Skip => {
                trace!("No text on {} page {}", path.display(), page_index + 1);
                self.metrics.record_skipped_page();
                PageText::Blank
            }
            TextSource::Ocr => {
                let started = Instant::now();
                let recognized = self.ocr.recognize_page(path, page_index, self.ocr_dpi);
                self.metrics.record_ocr_attempt(started.elapsed());
                match recognized {
                    Ok(text) => {
                        self.metrics.record_ocr_page();
                        PageText::Text {
                            text,
                            used_ocr: true,
                            degraded: None,
                        }
                    }
                    Err(err) => {
                        let err = PageError::new(
                            path,
                            page_index + 1,
                            err.page_error_kind(),
                            err.to_string(),
                        );
                        if visible_chars(&native) > 0 {
                            // Sparse native text beats nothing
                            PageText::Text {
                                text: native,
                                used_ocr: false,
                                degraded: Some(err),
                            }
                        } else {
                            PageText::Failed(err)
                        }
                    }
                }
            }
        }
    }
}

/// Turns a document where every page failed into a single file error
fn roll_up(path: &Path, failures: &[PageError]) -> FileError {
    let kind = if failures
        .iter()
        .all(|err| err.kind == PageErrorKind::OcrUnavailable)
    {
        FileErrorKind::OcrUnavailable
    } else {
        FileErrorKind::Corrupt
    };
    let reason = match failures.first() {
        Some(first) => format!("all {} pages failed; first: {}", failures.len(), first.reason),
        None => "no readable pages".to_string(),
    };
    FileError::new(path, kind, reason)
}
