use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};

pub const DEFAULT_OCR_DPI: u32 = 200;
pub const DEFAULT_SNIPPET_RADIUS: usize = 40;
pub const DEFAULT_OCR_MIN_CHARS: usize = 1;

/// Configuration for a PDF search session.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.pdfscout.yaml` in the current directory
/// 3. Global `$HOME/.config/pdfscout/config.yaml`
///
/// # Configuration Format
///
/// ```yaml
/// # Directory holding the PDFs
/// root_path: "~/invoices"
///
/// # Descend into subdirectories
/// recursive: true
///
/// # Literal text unless is_regex is set
/// pattern: "Order \\d+"
/// is_regex: true
/// ignore_case: false
///
/// # Rasterize and OCR pages without a text layer (slow)
/// include_ocr: true
/// ocr_dpi: 300
///
/// # Worker threads (default: CPU cores)
/// thread_count: 4
///
/// # Characters of context on each side of a match
/// snippet_radius: 40
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
///
/// A session accepts the value as-is; once a `SearchSession` is built from it the
/// configuration is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Root directory to start search from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Whether to descend into subdirectories of the root
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Text or regular expression to look for
    #[serde(default)]
    pub pattern: String,

    /// Treat `pattern` as a regular expression instead of literal text
    #[serde(default)]
    pub is_regex: bool,

    /// Case-insensitive matching
    #[serde(default)]
    pub ignore_case: bool,

    /// OCR pages whose native text layer is empty
    #[serde(default)]
    pub include_ocr: bool,

    /// Rasterization resolution handed to the OCR pipeline
    #[serde(default = "default_ocr_dpi")]
    pub ocr_dpi: NonZeroU32,

    /// Number of worker threads
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Characters of context kept on each side of a match
    #[serde(default = "default_snippet_radius")]
    pub snippet_radius: usize,

    /// Pages with fewer non-whitespace characters than this are sent to OCR
    #[serde(default = "default_ocr_min_chars")]
    pub ocr_min_chars: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_recursive() -> bool {
    true
}

fn default_ocr_dpi() -> NonZeroU32 {
    NonZeroU32::new(DEFAULT_OCR_DPI).unwrap_or(NonZeroU32::MIN)
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_snippet_radius() -> usize {
    DEFAULT_SNIPPET_RADIUS
}

fn default_ocr_min_chars() -> usize {
    DEFAULT_OCR_MIN_CHARS
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl SearchConfig {
    /// Creates a configuration with defaults for everything but the root and pattern
    pub fn new(root_path: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
            recursive: default_recursive(),
            pattern: pattern.into(),
            is_regex: false,
            ignore_case: false,
            include_ocr: false,
            ocr_dpi: default_ocr_dpi(),
            thread_count: default_thread_count(),
            snippet_radius: default_snippet_radius(),
            ocr_min_chars: default_ocr_min_chars(),
            log_level: default_log_level(),
        }
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_regex(mut self, is_regex: bool) -> Self {
        self.is_regex = is_regex;
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_ocr(mut self, include_ocr: bool) -> Self {
        self.include_ocr = include_ocr;
        self
    }

    pub fn with_ocr_dpi(mut self, dpi: NonZeroU32) -> Self {
        self.ocr_dpi = dpi;
        self
    }

    pub fn with_thread_count(mut self, threads: NonZeroUsize) -> Self {
        self.thread_count = threads;
        self
    }

    pub fn with_snippet_radius(mut self, radius: usize) -> Self {
        self.snippet_radius = radius;
        self
    }

    pub fn with_ocr_min_chars(mut self, min_chars: usize) -> Self {
        self.ocr_min_chars = min_chars;
        self
    }

    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file layered over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("pdfscout/config.yaml")),
            Some(PathBuf::from(".pdfscout.yaml")),
            config_path.map(PathBuf::from),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file that does not exist is an error, not a silent default
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli_config: SearchConfig) -> Self {
        // CLI values take precedence over config file values
        if !cli_config.pattern.is_empty() {
            self.pattern = cli_config.pattern;
        }
        if cli_config.root_path != default_root_path() {
            self.root_path = cli_config.root_path;
        }
        if cli_config.recursive != default_recursive() {
            self.recursive = cli_config.recursive;
        }
        if cli_config.is_regex {
            self.is_regex = true;
        }
        if cli_config.ignore_case {
            self.ignore_case = true;
        }
        if cli_config.include_ocr {
            self.include_ocr = true;
        }
        if cli_config.ocr_dpi != default_ocr_dpi() {
            self.ocr_dpi = cli_config.ocr_dpi;
        }
        if cli_config.thread_count != default_thread_count() {
            self.thread_count = cli_config.thread_count;
        }
        if cli_config.snippet_radius != default_snippet_radius() {
            self.snippet_radius = cli_config.snippet_radius;
        }
        if cli_config.ocr_min_chars != default_ocr_min_chars() {
            self.ocr_min_chars = cli_config.ocr_min_chars;
        }
        if cli_config.log_level != default_log_level() {
            self.log_level = cli_config.log_level;
        }
        self
    }

    /// Checks everything that must hold before a session may dispatch work.
    ///
    /// Pattern compilation is checked separately by the matcher.
    pub fn validate(&self) -> SearchResult<()> {
        if self.pattern.trim().is_empty() {
            return Err(SearchError::EmptyPattern);
        }
        if !self.root_path.is_dir() {
            return Err(SearchError::invalid_root(&self.root_path));
        }
        // A root that exists but cannot be listed would silently yield no files
        std::fs::read_dir(&self.root_path)
            .map_err(|_| SearchError::invalid_root(&self.root_path))?;
        Ok(())
    }
}
