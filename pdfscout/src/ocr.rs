//! OCR fallback for pages without a native text layer.
//!
//! Recognition is split in two steps so each can be swapped independently:
//! a [`Rasterizer`] renders one page to an image at a given DPI, and an
//! [`OcrEngine`] turns that image into text. The production pair shells out to
//! poppler's `pdftoppm` and to `tesseract`; both are optional at the system
//! level, and their absence surfaces as [`OcrError::Unavailable`] per page rather
//! than as a crash.

use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, trace, warn};

use crate::errors::OcrError;

const PDFTOPPM: &str = "pdftoppm";
const TESSERACT: &str = "tesseract";

/// A rendered page on disk. Temporary files are removed on drop.
#[derive(Debug)]
pub struct RasterImage {
    path: PathBuf,
    dpi: u32,
    _scratch: Option<TempDir>,
}

impl RasterImage {
    /// Wraps an existing image file
    pub fn new(path: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            path: path.into(),
            dpi,
            _scratch: None,
        }
    }

    fn in_scratch_dir(scratch: TempDir, path: PathBuf, dpi: u32) -> Self {
        Self {
            path,
            dpi,
            _scratch: Some(scratch),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }
}

/// Renders a single PDF page to an image
pub trait Rasterizer: Send + Sync {
    fn is_available(&self) -> bool;

    /// Renders the 0-based page of the document at `path`
    fn rasterize(&self, path: &Path, page_index: usize, dpi: u32)
        -> Result<RasterImage, OcrError>;
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "tesseract")
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    fn recognize(&self, image: &RasterImage, dpi: u32) -> Result<String, OcrError>;
}

/// Resolves a binary on PATH once and remembers the answer
#[derive(Debug)]
struct Tool {
    name: &'static str,
    resolved: OnceCell<Option<PathBuf>>,
}

impl Tool {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            resolved: OnceCell::new(),
        }
    }

    fn path(&self) -> Option<&Path> {
        self.resolved
            .get_or_init(|| match which::which(self.name) {
                Ok(path) => {
                    debug!("Found {} at {}", self.name, path.display());
                    Some(path)
                }
                Err(_) => {
                    warn!("{} not found on PATH; OCR will be unavailable", self.name);
                    None
                }
            })
            .as_deref()
    }

    fn require(&self) -> Result<&Path, OcrError> {
        self.path()
            .ok_or_else(|| OcrError::Unavailable(format!("{} not found on PATH", self.name)))
    }
}

fn run(command: &mut Command, tool: &str) -> Result<Vec<u8>, String> {
    let output = command
        .output()
        .map_err(|e| format!("failed to start {}: {}", tool, e))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{} exited with {}: {}", tool, output.status, stderr.trim()));
    }
    Ok(output.stdout)
}

/// [`Rasterizer`] backed by poppler's `pdftoppm`
#[derive(Debug)]
pub struct PdftoppmRasterizer {
    tool: Tool,
}

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(PDFTOPPM),
        }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn is_available(&self) -> bool {
        self.tool.path().is_some()
    }

    fn rasterize(
        &self,
        path: &Path,
        page_index: usize,
        dpi: u32,
    ) -> Result<RasterImage, OcrError> {
        let binary = self.tool.require()?;
        let scratch = tempfile::Builder::new().prefix("pdfscout-").tempdir()?;
        let prefix = scratch.path().join("page");
        let page = (page_index + 1).to_string();

        trace!("Rasterizing {} page {} at {} dpi", path.display(), page, dpi);
        run(
            Command::new(binary)
                .arg("-r")
                .arg(dpi.to_string())
                .arg("-f")
                .arg(&page)
                .arg("-l")
                .arg(&page)
                .arg("-png")
                .arg("-singlefile")
                .arg(path)
                .arg(&prefix),
            PDFTOPPM,
        )
        .map_err(OcrError::Render)?;

        let image = prefix.with_extension("png");
        if !image.exists() {
            return Err(OcrError::Render(format!(
                "{} produced no image for page {}",
                PDFTOPPM, page
            )));
        }
        Ok(RasterImage::in_scratch_dir(scratch, image, dpi))
    }
}

/// [`OcrEngine`] backed by the `tesseract` command-line tool
#[derive(Debug)]
pub struct TesseractEngine {
    tool: Tool,
    language: String,
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self::with_language("eng")
    }

    pub fn with_language(language: impl Into<String>) -> Self {
        Self {
            tool: Tool::new(TESSERACT),
            language: language.into(),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        TESSERACT
    }

    fn is_available(&self) -> bool {
        self.tool.path().is_some()
    }

    fn recognize(&self, image: &RasterImage, dpi: u32) -> Result<String, OcrError> {
        let binary = self.tool.require()?;
        let stdout = run(
            Command::new(binary)
                .arg(image.path())
                .arg("stdout")
                .arg("-l")
                .arg(&self.language)
                .arg("--dpi")
                .arg(dpi.to_string()),
            TESSERACT,
        )
        .map_err(OcrError::Recognition)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// Rasterize-then-recognize, the only way the processor reaches OCR
#[derive(Clone)]
pub struct OcrTextSource {
    rasterizer: Arc<dyn Rasterizer>,
    engine: Arc<dyn OcrEngine>,
}

impl OcrTextSource {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, engine: Arc<dyn OcrEngine>) -> Self {
        Self { rasterizer, engine }
    }

    /// `pdftoppm` + `tesseract` from PATH
    pub fn system() -> Self {
        Self::new(
            Arc::new(PdftoppmRasterizer::new()),
            Arc::new(TesseractEngine::new()),
        )
    }

    pub fn is_available(&self) -> bool {
        self.rasterizer.is_available() && self.engine.is_available()
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Recognized text of the 0-based page of the document at `path`
    pub fn recognize_page(
        &self,
        path: &Path,
        page_index: usize,
        dpi: u32,
    ) -> Result<String, OcrError> {
        if !self.engine.is_available() {
            return Err(OcrError::Unavailable(format!(
                "{} is not installed",
                self.engine.name()
            )));
        }
        let image = self.rasterizer.rasterize(path, page_index, dpi)?;
        self.engine.recognize(&image, dpi)
    }
}

impl std::fmt::Debug for OcrTextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrTextSource")
            .field("engine", &self.engine.name())
            .finish()
    }
}
