//! Native text layer access.
//!
//! The engine only needs three things from a PDF library: open a document,
//! count its pages, and pull the text of one page. [`PdfBackend`] and
//! [`PdfDocument`] are that narrow seam; [`LopdfBackend`] is the production
//! implementation.

use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::errors::{FileError, PageError, PageErrorKind};

/// Opens PDF documents. Shared by every worker.
pub trait PdfBackend: Send + Sync {
    /// Opens a document, classifying failures as unreadable, encrypted or corrupt
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, FileError>;
}

/// An open document, owned exclusively by one worker and released on drop
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    /// Native text of the 0-based page. Pure: same page, same text.
    fn page_text(&self, page_index: usize) -> Result<String, PageError>;
}

/// [`PdfBackend`] built on `lopdf`
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Heuristic for parse failures: an `/Encrypt` entry means the parse most
/// likely failed on the encryption, not on a damaged file
fn looks_encrypted(bytes: &[u8]) -> bool {
    const MARKER: &[u8] = b"/Encrypt";
    bytes.windows(MARKER.len()).any(|w| w == MARKER)
}

impl PdfBackend for LopdfBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, FileError> {
        let bytes = std::fs::read(path).map_err(|e| FileError::from_io(path, &e))?;

        let mut document = Document::load_mem(&bytes).map_err(|e| {
            if looks_encrypted(&bytes) {
                FileError::encrypted(path)
            } else {
                FileError::corrupt(path, e.to_string())
            }
        })?;

        if document.is_encrypted() {
            // Owner-password-only files open with the empty user password
            document.decrypt("").map_err(|_| FileError::encrypted(path))?;
            debug!("Decrypted {} with the empty user password", path.display());
        }

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        trace!("Opened {} ({} pages)", path.display(), page_numbers.len());

        Ok(Box::new(LopdfDocument {
            path: path.to_path_buf(),
            document,
            page_numbers,
        }))
    }
}

struct LopdfDocument {
    path: PathBuf,
    document: Document,
    /// 1-based page numbers as lopdf reports them, in page order
    page_numbers: Vec<u32>,
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, page_index: usize) -> Result<String, PageError> {
        let page_number = *self.page_numbers.get(page_index).ok_or_else(|| {
            PageError::new(
                &self.path,
                page_index + 1,
                PageErrorKind::Extraction,
                "page index out of range",
            )
        })?;

        self.document.extract_text(&[page_number]).map_err(|e| {
            PageError::new(
                &self.path,
                page_index + 1,
                PageErrorKind::Extraction,
                e.to_string(),
            )
        })
    }
}
