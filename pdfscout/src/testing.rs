//! In-crate test doubles for the PDF and OCR seams.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::errors::{FileError, FileErrorKind, OcrError, PageError, PageErrorKind};
use crate::ocr::{OcrEngine, RasterImage, Rasterizer};
use crate::pdf::{PdfBackend, PdfDocument};

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
enum MockDoc {
    Pages(Vec<Result<String, String>>),
    OpenError(FileErrorKind),
    Panic,
}

/// Serves documents keyed by file name; the bytes on disk are ignored
#[derive(Debug, Default)]
pub struct MockBackend {
    docs: HashMap<String, MockDoc>,
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(mut self, name: &str, pages: &[&str]) -> Self {
        let pages = pages.iter().map(|p| Ok(p.to_string())).collect();
        self.docs.insert(name.to_string(), MockDoc::Pages(pages));
        self
    }

    /// Pages given as `Err(reason)` fail native extraction
    pub fn with_page_results(mut self, name: &str, pages: Vec<Result<&str, &str>>) -> Self {
        let pages = pages
            .into_iter()
            .map(|p| p.map(str::to_string).map_err(str::to_string))
            .collect();
        self.docs.insert(name.to_string(), MockDoc::Pages(pages));
        self
    }

    pub fn with_open_error(mut self, name: &str, kind: FileErrorKind) -> Self {
        self.docs.insert(name.to_string(), MockDoc::OpenError(kind));
        self
    }

    /// Every open sleeps first, to keep files in flight
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Opening `name` panics, as a parser might on hostile input
    pub fn with_panic(mut self, name: &str) -> Self {
        self.docs.insert(name.to_string(), MockDoc::Panic);
        self
    }
}

impl PdfBackend for MockBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, FileError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        match self.docs.get(&file_name(path)) {
            Some(MockDoc::Pages(pages)) => Ok(Box::new(MockDocument {
                path: path.display().to_string(),
                pages: pages.clone(),
            })),
            Some(MockDoc::OpenError(kind)) => Err(FileError::new(path, *kind, "mock open failure")),
            Some(MockDoc::Panic) => panic!("mock parser blew up on {}", path.display()),
            None => Err(FileError::corrupt(path, "unknown mock document")),
        }
    }
}

struct MockDocument {
    path: String,
    pages: Vec<Result<String, String>>,
}

impl PdfDocument for MockDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page_index: usize) -> Result<String, PageError> {
        match &self.pages[page_index] {
            Ok(text) => Ok(text.clone()),
            Err(reason) => Err(PageError::new(
                &self.path,
                page_index + 1,
                PageErrorKind::Extraction,
                reason.clone(),
            )),
        }
    }
}

/// Produces a fake image named `<file name>#<page>` without touching disk
#[derive(Debug, Default)]
pub struct MockRasterizer {
    calls: AtomicUsize,
    fail: bool,
}

impl MockRasterizer {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Rasterizer for MockRasterizer {
    fn is_available(&self) -> bool {
        true
    }

    fn rasterize(
        &self,
        path: &Path,
        page_index: usize,
        dpi: u32,
    ) -> Result<RasterImage, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(OcrError::Render("mock render failure".to_string()));
        }
        Ok(RasterImage::new(
            format!("{}#{}", file_name(path), page_index + 1),
            dpi,
        ))
    }
}

/// Returns canned text, optionally per source file name
#[derive(Debug, Default)]
pub struct MockOcrEngine {
    default_text: String,
    by_file: HashMap<String, String>,
    available: bool,
    calls: AtomicUsize,
    last_dpi: Mutex<Option<u32>>,
}

impl MockOcrEngine {
    pub fn returning(text: &str) -> Self {
        Self {
            default_text: text.to_string(),
            available: true,
            ..Default::default()
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn with_file_text(mut self, name: &str, text: &str) -> Self {
        self.by_file.insert(name.to_string(), text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_dpi(&self) -> Option<u32> {
        *self.last_dpi.lock().unwrap()
    }
}

impl OcrEngine for MockOcrEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn recognize(&self, image: &RasterImage, dpi: u32) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_dpi.lock().unwrap() = Some(dpi);
        if !self.available {
            return Err(OcrError::Unavailable("mock engine missing".to_string()));
        }
        let image_name = image.path().to_string_lossy();
        let source = image_name.split('#').next().unwrap_or_default();
        Ok(self
            .by_file
            .get(source)
            .cloned()
            .unwrap_or_else(|| self.default_text.clone()))
    }
}
