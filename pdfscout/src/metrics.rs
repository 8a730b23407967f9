use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Tracks page-level work across all workers
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    native_pages: Arc<AtomicU64>,
    ocr_pages: Arc<AtomicU64>,
    skipped_pages: Arc<AtomicU64>,
    degraded_pages: Arc<AtomicU64>,

    // OCR cost
    ocr_attempts: Arc<AtomicU64>,
    ocr_micros: Arc<AtomicU64>,

    files_opened: Arc<AtomicU64>,
    files_failed: Arc<AtomicU64>,
}

impl SearchMetrics {
    /// Creates a new SearchMetrics instance
    pub fn new() -> Self {
        Self {
            native_pages: Arc::new(AtomicU64::new(0)),
            ocr_pages: Arc::new(AtomicU64::new(0)),
            skipped_pages: Arc::new(AtomicU64::new(0)),
            degraded_pages: Arc::new(AtomicU64::new(0)),
            ocr_attempts: Arc::new(AtomicU64::new(0)),
            ocr_micros: Arc::new(AtomicU64::new(0)),
            files_opened: Arc::new(AtomicU64::new(0)),
            files_failed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_native_page(&self) {
        self.native_pages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ocr_page(&self) {
        self.ocr_pages.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a page with no usable text and OCR disabled
    pub fn record_skipped_page(&self) {
        self.skipped_pages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degraded_page(&self) {
        self.degraded_pages.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one OCR invocation and how long it took, successful or not
    pub fn record_ocr_attempt(&self, elapsed: std::time::Duration) {
        self.ocr_attempts.fetch_add(1, Ordering::Relaxed);
        self.ocr_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_file_opened(&self) {
        self.files_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets a snapshot of the counters
    pub fn get_stats(&self) -> SearchStats {
        SearchStats {
            native_pages: self.native_pages.load(Ordering::Relaxed),
            ocr_pages: self.ocr_pages.load(Ordering::Relaxed),
            skipped_pages: self.skipped_pages.load(Ordering::Relaxed),
            degraded_pages: self.degraded_pages.load(Ordering::Relaxed),
            ocr_attempts: self.ocr_attempts.load(Ordering::Relaxed),
            ocr_micros: self.ocr_micros.load(Ordering::Relaxed),
            files_opened: self.files_opened.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Search stats:\n\
             Files opened/failed: {}/{}\n\
             Pages native/ocr/skipped/degraded: {}/{}/{}/{}\n\
             OCR attempts: {} ({} ms total)",
            stats.files_opened,
            stats.files_failed,
            stats.native_pages,
            stats.ocr_pages,
            stats.skipped_pages,
            stats.degraded_pages,
            stats.ocr_attempts,
            stats.ocr_micros / 1000
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`SearchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub native_pages: u64,
    pub ocr_pages: u64,
    pub skipped_pages: u64,
    pub degraded_pages: u64,
    pub ocr_attempts: u64,
    pub ocr_micros: u64,
    pub files_opened: u64,
    pub files_failed: u64,
}
