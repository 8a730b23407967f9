use crossbeam::channel;
use ignore::WalkBuilder;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::processor::FileProcessor;
use crate::errors::{EnumerationError, FileError, SearchError, SearchResult};
use crate::filters::should_include_file;
use crate::results::{FileOutcome, FileTask, Progress};

/// Shared stop flag, checked before each file is handed to a worker
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops dispatch of new files. Files already in flight run to completion.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The files found under a root, in search order
#[derive(Debug, Default)]
pub struct Enumeration {
    pub tasks: Vec<FileTask>,
    /// Entries that could not be walked; the tasks found are still valid
    pub error: Option<EnumerationError>,
}

/// Completed work of one run
#[derive(Debug, Default)]
pub struct ScheduleOutcome {
    /// Outcomes of the files that ran, in enumeration order
    pub outcomes: Vec<FileOutcome>,
    /// Whether dispatch stopped early because of cancellation
    pub cancelled: bool,
}

/// Runs a [`FileProcessor`] over many files on a bounded worker pool
#[derive(Debug)]
pub struct WorkScheduler {
    processor: FileProcessor,
    thread_count: usize,
    cancel: CancellationToken,
}

impl WorkScheduler {
    pub fn new(processor: FileProcessor, thread_count: usize, cancel: CancellationToken) -> Self {
        Self {
            processor,
            thread_count: thread_count.max(1),
            cancel,
        }
    }

    /// Lists the PDF files under `root`, sorted by path.
    ///
    /// Hidden files and ignore files are not honored: every `.pdf` below the
    /// root is a candidate. Symlinks are not followed.
    pub fn enumerate(root: &Path, recursive: bool) -> Enumeration {
        let mut walker = WalkBuilder::new(root);
        walker.standard_filters(false).follow_links(false);
        if !recursive {
            walker.max_depth(Some(1));
        }

        let mut enumeration = Enumeration::default();
        for entry in walker.build() {
            match entry {
                Ok(entry) => {
                    let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
                    if should_include_file(entry.path(), is_file) {
                        trace!("Queued {}", entry.path().display());
                        enumeration.tasks.push(FileTask::new(entry.into_path()));
                    }
                }
                Err(err) => {
                    warn!("Failed to read directory entry: {}", err);
                    EnumerationError::record(&mut enumeration.error, err.to_string());
                }
            }
        }
        enumeration.tasks.sort();

        debug!("Found {} files to process", enumeration.tasks.len());
        enumeration
    }

    /// Processes `tasks` in parallel, calling `on_progress` after every file.
    ///
    /// Progress is reported on the calling thread in completion order. The
    /// returned outcomes are in the order of `tasks`, whatever order the workers
    /// finished in. After cancellation no further task is started; every task
    /// that was started appears in the result.
    pub fn run<F>(&self, tasks: &[FileTask], mut on_progress: F) -> SearchResult<ScheduleOutcome>
    where
        F: FnMut(Progress),
    {
        let files_total = tasks.len();
        if files_total == 0 {
            return Ok(ScheduleOutcome {
                outcomes: Vec::new(),
                cancelled: self.cancel.is_cancelled(),
            });
        }

        let workers = self.thread_count.min(files_total);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pdfscout-worker-{i}"))
            .build()
            .map_err(|e| SearchError::WorkerPool(e.to_string()))?;
        debug!("Searching {} files with {} workers", files_total, workers);

        let next_task = AtomicUsize::new(0);
        let (sender, receiver) = channel::unbounded::<(usize, FileOutcome)>();
        let mut slots: Vec<Option<FileOutcome>> = (0..files_total).map(|_| None).collect();

        pool.in_place_scope(|scope| {
            for _ in 0..workers {
                let sender = sender.clone();
                let next_task = &next_task;
                let cancel = &self.cancel;
                let processor = &self.processor;
                scope.spawn(move |_| loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let index = next_task.fetch_add(1, Ordering::SeqCst);
                    let Some(task) = tasks.get(index) else {
                        break;
                    };
                    let outcome = process_isolated(processor, task);
                    if sender.send((index, outcome)).is_err() {
                        break;
                    }
                });
            }
            // Workers hold the remaining senders; the loop ends when they all exit
            drop(sender);

            let mut files_done = 0;
            let mut matches_so_far = 0;
            for (index, outcome) in receiver.iter() {
                files_done += 1;
                matches_so_far += outcome.match_count();
                on_progress(Progress {
                    files_done,
                    files_total,
                    matches_so_far,
                    current_file: Some(outcome.path().to_path_buf()),
                });
                slots[index] = Some(outcome);
            }
        });

        let outcomes: Vec<FileOutcome> = slots.into_iter().flatten().collect();
        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            debug!(
                "Cancelled after {} of {} files",
                outcomes.len(),
                files_total
            );
        }
        Ok(ScheduleOutcome {
            outcomes,
            cancelled,
        })
    }
}

/// Runs one file, turning a panic inside the parser into a failed outcome
fn process_isolated(processor: &FileProcessor, task: &FileTask) -> FileOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| processor.process(task))) {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!("Processing {} panicked", task.path().display());
            FileOutcome::Failed(FileError::corrupt(task.path(), "parser panicked"))
        }
    }
}
