use crossbeam::channel::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::matcher::PatternMatcher;
use super::processor::FileProcessor;
use super::scheduler::{CancellationToken, WorkScheduler};
use crate::config::SearchConfig;
use crate::errors::{unify_path, SearchError, SearchResult};
use crate::ocr::OcrTextSource;
use crate::pdf::{LopdfBackend, PdfBackend};
use crate::results::{Progress, SearchEvent, SearchReport};

/// One configured search over one directory tree
pub struct SearchSession {
    config: SearchConfig,
    matcher: PatternMatcher,
    backend: Arc<dyn PdfBackend>,
    ocr: OcrTextSource,
    cancel: CancellationToken,
}

impl std::fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSession")
            .field("config", &self.config)
            .field("ocr", &self.ocr)
            .finish()
    }
}

impl SearchSession {
    /// Validates `config`, canonicalizes its root and compiles its pattern.
    ///
    /// Fails with a [`SearchError`] before any file is touched when the pattern
    /// is empty or invalid, or the root is not a directory. Uses lopdf for text
    /// and `pdftoppm` + `tesseract` for OCR unless replaced.
    pub fn new(mut config: SearchConfig) -> SearchResult<Self> {
        config.validate()?;
        config.root_path = unify_path(&config.root_path);
        let compiled =
            PatternMatcher::compile(&config.pattern, config.is_regex, config.ignore_case)?;
        let matcher = PatternMatcher::new(compiled, config.snippet_radius);
        Ok(Self {
            config,
            matcher,
            backend: Arc::new(LopdfBackend::new()),
            ocr: OcrTextSource::system(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_backend(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_ocr(mut self, ocr: OcrTextSource) -> Self {
        self.ocr = ocr;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// A token that stops this session from dispatching further files
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the search to completion on the calling thread's pool.
    ///
    /// `on_progress` is called after every completed file.
    pub fn run<F>(&self, on_progress: F) -> SearchResult<SearchReport>
    where
        F: FnMut(Progress),
    {
        let started = Instant::now();
        info!(
            "Starting search for {:?} under {}",
            self.config.pattern,
            self.config.root_path.display()
        );

        let enumeration = WorkScheduler::enumerate(&self.config.root_path, self.config.recursive);
        if let Some(err) = &enumeration.error {
            warn!("{}", err);
        }

        if self.config.include_ocr && !self.ocr.is_available() {
            warn!(
                "OCR requested but {} is not available; image-only pages will be errors",
                self.ocr.engine_name()
            );
        }

        let processor = FileProcessor::new(
            self.matcher.clone(),
            Arc::clone(&self.backend),
            self.ocr.clone(),
            &self.config,
        );
        let metrics = processor.metrics().clone();
        let scheduler = WorkScheduler::new(
            processor,
            self.config.thread_count.get(),
            self.cancel.clone(),
        );
        let scheduled = scheduler.run(&enumeration.tasks, on_progress)?;

        let mut report = SearchReport::new(enumeration.tasks.len());
        report.enumeration_error = enumeration.error;
        for outcome in scheduled.outcomes {
            report.add_outcome(outcome);
        }
        report.cancelled = scheduled.cancelled;
        report.elapsed = started.elapsed();

        metrics.log_stats();
        info!("{}", report);
        Ok(report)
    }

    /// Runs the search on a background thread.
    ///
    /// The returned handle yields a [`SearchEvent::Progress`] per completed file
    /// and ends with exactly one [`SearchEvent::Finished`] when the search
    /// succeeds. If the search fails (e.g. the worker pool cannot start) the
    /// events end without `Finished` and [`SearchHandle::wait`] returns the error.
    pub fn spawn(self) -> SearchResult<SearchHandle> {
        let (sender, events) = channel::unbounded();
        let cancel = self.cancel.clone();

        let worker = std::thread::Builder::new()
            .name("pdfscout-session".to_string())
            .spawn(move || {
                let report = self.run(|progress| {
                    // A dropped handle just stops listening
                    let _ = sender.send(SearchEvent::Progress(progress));
                })?;
                let _ = sender.send(SearchEvent::Finished(report.clone()));
                Ok(report)
            })?;

        Ok(SearchHandle {
            events,
            cancel,
            worker: Some(worker),
            finished: false,
        })
    }
}

/// A search running in the background
#[derive(Debug)]
pub struct SearchHandle {
    events: Receiver<SearchEvent>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<SearchResult<SearchReport>>>,
    finished: bool,
}

impl SearchHandle {
    /// Stops dispatch; the events still end with a `Finished` report
    pub fn cancel(&self) {
        debug!("Cancellation requested");
        self.cancel.cancel();
    }

    /// Blocks until the search ends and returns its report, or the error that
    /// ended it early
    pub fn wait(mut self) -> SearchResult<SearchReport> {
        let Some(worker) = self.worker.take() else {
            return Err(SearchError::WorkerPool("search already collected".to_string()));
        };
        worker
            .join()
            .map_err(|_| SearchError::WorkerPool("search thread panicked".to_string()))?
    }
}

impl Iterator for SearchHandle {
    type Item = SearchEvent;

    fn next(&mut self) -> Option<SearchEvent> {
        if self.finished {
            return None;
        }
        match self.events.recv() {
            Ok(event) => {
                self.finished = matches!(event, SearchEvent::Finished(_));
                Some(event)
            }
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }
}
