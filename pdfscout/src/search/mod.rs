/// The search engine proper.
///
/// A run moves through four stages, each in its own module:
///
/// 1. [`scheduler::WorkScheduler::enumerate`] walks the root and produces one
///    [`FileTask`](crate::results::FileTask) per PDF, in sorted path order.
/// 2. [`scheduler::WorkScheduler::run`] hands tasks to a bounded rayon pool.
///    Workers pull the next index from a shared atomic counter, so a slow
///    OCR-heavy file never holds up the queue behind it.
/// 3. [`processor::FileProcessor`] opens one document, chooses a
///    [`processor::TextSource`] per page and runs the matcher over the text.
/// 4. Outcomes come back over a channel to the calling thread, which reports
///    progress in completion order and stores each outcome in its enumeration
///    slot. The final report is therefore identical from run to run.
///
/// ```rust,ignore
/// let session = SearchSession::new(SearchConfig::new("invoices", "Order"))?;
/// let report = session.run(|p| eprintln!("{}/{}", p.files_done, p.files_total))?;
/// println!("{report}");
/// ```
///
/// Cancellation is cooperative: the [`CancellationToken`] is read before each
/// dispatch and a file already in flight always runs to the end.
pub mod matcher;
pub mod processor;
pub mod scheduler;
pub mod session;

pub use matcher::{CompiledPattern, PatternMatch, PatternMatcher};
pub use processor::{FileProcessor, TextSource};
pub use scheduler::{CancellationToken, Enumeration, ScheduleOutcome, WorkScheduler};
pub use session::{SearchHandle, SearchSession};
