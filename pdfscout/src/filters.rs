/// File admission rules for the enumerator.
///
/// Only regular files whose extension is `pdf` (any case) become search tasks.
/// Everything else under the root is skipped silently.
use std::path::Path;

pub const PDF_EXTENSION: &str = "pdf";

/// Checks if a path carries the `.pdf` extension, ignoring case
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PDF_EXTENSION))
}

/// Determines if a directory entry should become a search task
pub fn should_include_file(path: &Path, is_file: bool) -> bool {
    is_file && has_pdf_extension(path)
}
