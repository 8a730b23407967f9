pub mod config;
pub mod errors;
pub mod filters;
pub mod logging;
pub mod metrics;
pub mod ocr;
pub mod pdf;
pub mod results;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use config::SearchConfig;
pub use errors::{
    EnumerationError, FileError, FileErrorKind, OcrError, PageError, PageErrorKind, SearchError,
    SearchResult,
};
pub use logging::init_logging;
pub use ocr::{OcrEngine, OcrTextSource, RasterImage, Rasterizer};
pub use pdf::{LopdfBackend, PdfBackend, PdfDocument};
pub use results::{
    FileMatches, FileOutcome, FileTask, PageResult, Progress, SearchEvent, SearchReport,
};
pub use search::{CancellationToken, SearchHandle, SearchSession};
