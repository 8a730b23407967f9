use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pdfscout::config::{DEFAULT_OCR_DPI, DEFAULT_OCR_MIN_CHARS, DEFAULT_SNIPPET_RADIUS};
use pdfscout::{init_logging, PageResult, SearchConfig, SearchReport, SearchSession};
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Search PDF documents, including scanned ones",
    long_about = None
)]
struct Cli {
    /// Folder containing the PDF files
    folder: PathBuf,

    /// Text to search for (a regular expression with --regex)
    query: String,

    /// Treat the query as a regular expression
    #[arg(short = 'r', long)]
    regex: bool,

    /// Match regardless of letter case
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Only search the folder itself, not its subfolders
    #[arg(long)]
    no_recursive: bool,

    /// OCR pages that have no text layer (needs pdftoppm and tesseract)
    #[arg(long)]
    include_ocr: bool,

    /// Resolution used when rasterizing pages for OCR
    #[arg(long)]
    ocr_dpi: Option<NonZeroU32>,

    /// Pages with fewer visible characters than this are sent to OCR
    #[arg(long)]
    ocr_min_chars: Option<usize>,

    /// Number of threads to use
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Characters of context shown on each side of a match
    #[arg(long)]
    snippet_radius: Option<usize>,

    /// Configuration file layered over the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Show only statistics, not matches
    #[arg(short, long)]
    stats: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn search_config(&self) -> SearchConfig {
        let mut config = SearchConfig::new(&self.folder, &self.query)
            .with_recursive(!self.no_recursive)
            .with_regex(self.regex)
            .with_ignore_case(self.ignore_case)
            .with_ocr(self.include_ocr)
            .with_snippet_radius(self.snippet_radius.unwrap_or(DEFAULT_SNIPPET_RADIUS))
            .with_ocr_min_chars(self.ocr_min_chars.unwrap_or(DEFAULT_OCR_MIN_CHARS));
        if let Some(dpi) = self.ocr_dpi {
            config = config.with_ocr_dpi(dpi);
        }
        if let Some(threads) = self.threads {
            config = config.with_thread_count(threads);
        }
        config.log_level = self.log_level.clone();
        config
    }
}

fn load_config(cli: &Cli) -> Result<SearchConfig> {
    let from_cli = cli.search_config();
    match SearchConfig::load_from(cli.config.as_deref()) {
        Ok(from_files) => Ok(from_files.merge_with_cli(from_cli)),
        Err(e) if cli.config.is_some() => Err(e).context("Failed to load configuration"),
        Err(e) => {
            debug!("Ignoring default configuration files: {}", e);
            Ok(from_cli)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = load_config(&cli)?;
    debug!(
        "OCR {} at {} dpi (default {})",
        if config.include_ocr { "enabled" } else { "disabled" },
        config.ocr_dpi,
        DEFAULT_OCR_DPI
    );
    let session = SearchSession::new(config)?;

    let progress = if cli.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    let report = session.run(|p| {
        progress.set_length(p.files_total as u64);
        progress.set_position(p.files_done as u64);
        if let Some(file) = p.current_file.as_deref().and_then(Path::file_name) {
            progress.set_message(file.to_string_lossy().into_owned());
        }
    })?;
    progress.finish_and_clear();

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print_search_results(&report, cli.stats);
    }
    Ok(())
}

fn highlighted_snippet(m: &PageResult) -> String {
    let snippet = m.display_snippet();
    let matched = m.matched.split_whitespace().collect::<Vec<_>>().join(" ");
    if matched.is_empty() {
        return snippet;
    }
    snippet.replacen(&matched, &matched.red().bold().to_string(), 1)
}

fn print_search_results(report: &SearchReport, stats_only: bool) {
    if !stats_only {
        let mut current: Option<&Path> = None;
        for m in &report.matches {
            if current != Some(m.path.as_path()) {
                println!("\n{}", m.path.display().to_string().blue());
                current = Some(m.path.as_path());
            }
            let tag = if m.used_ocr {
                format!(" {}", "[OCR]".yellow())
            } else {
                String::new()
            };
            println!(
                "{}{}: {}",
                format!("p.{}", m.page).green(),
                tag,
                highlighted_snippet(m)
            );
        }

        if !report.page_errors.is_empty() {
            println!("\n{}", "Pages skipped:".yellow());
            for err in &report.page_errors {
                println!("  {}", err);
            }
        }
    }

    if !report.errors.is_empty() {
        println!("\n{}", "Errors:".red());
        for err in &report.errors {
            println!("  {}", err.to_string().red());
        }
    }

    if let Some(err) = &report.enumeration_error {
        println!("\n{}", err.to_string().yellow());
        for failure in &err.failures {
            println!("  {}", failure);
        }
    }

    println!("\n{}", report);
}
