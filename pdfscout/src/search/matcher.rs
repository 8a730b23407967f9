use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::errors::{SearchError, SearchResult};

/// Strategy for pattern matching
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    /// Case-sensitive literal text, matched with a plain substring scan
    Literal(String),
    /// A user regex, or a case-insensitive literal compiled as an escaped regex
    Regex(Regex),
}

/// A pattern compiled once per session and shared read-only by every worker
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    strategy: MatchStrategy,
}

impl CompiledPattern {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn strategy(&self) -> &MatchStrategy {
        &self.strategy
    }

    /// Byte spans of every non-overlapping, non-empty match, in order
    pub fn spans(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.strategy {
            MatchStrategy::Literal(needle) => text
                .match_indices(needle.as_str())
                .map(|(start, matched)| (start, start + matched.len()))
                .collect(),
            MatchStrategy::Regex(regex) => regex
                .find_iter(text)
                .filter(|m| !m.is_empty())
                .map(|m| (m.start(), m.end()))
                .collect(),
        }
    }
}

/// One hit inside one block of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Byte offset of the match start within the searched text
    pub offset: usize,
    /// Byte offset one past the match end
    pub end: usize,
    pub matched: String,
    /// Verbatim text around the match; `snippet_start` locates it in the source
    pub snippet: String,
    pub snippet_start: usize,
}

/// Finds matches of a compiled pattern and cuts snippets around them
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: CompiledPattern,
    snippet_radius: usize,
}

impl PatternMatcher {
    /// Compiles a pattern, failing fast on invalid regex syntax.
    ///
    /// Case-insensitivity is always a compile flag so reported offsets point
    /// into the original text.
    pub fn compile(
        pattern: &str,
        is_regex: bool,
        ignore_case: bool,
    ) -> SearchResult<CompiledPattern> {
        if pattern.is_empty() {
            return Err(SearchError::EmptyPattern);
        }

        let strategy = if is_regex {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(ignore_case)
                .dot_matches_new_line(true)
                .build()
                .map_err(|e| SearchError::invalid_pattern(e.to_string()))?;
            MatchStrategy::Regex(regex)
        } else if ignore_case {
            let regex = RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
                .map_err(|e| SearchError::invalid_pattern(e.to_string()))?;
            MatchStrategy::Regex(regex)
        } else {
            MatchStrategy::Literal(pattern.to_string())
        };

        debug!(
            "Compiled pattern '{}' (regex: {}, ignore case: {})",
            pattern, is_regex, ignore_case
        );
        Ok(CompiledPattern {
            source: pattern.to_string(),
            strategy,
        })
    }

    pub fn new(pattern: CompiledPattern, snippet_radius: usize) -> Self {
        Self {
            pattern,
            snippet_radius,
        }
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    /// Finds all matches in the given text.
    ///
    /// Matching never looks past `text`, so callers that pass one page at a
    /// time never see a match spanning two pages.
    pub fn find(&self, text: &str) -> Vec<PatternMatch> {
        self.pattern
            .spans(text)
            .into_iter()
            .map(|(start, end)| {
                let (lo, hi) = snippet_bounds(text, start, end, self.snippet_radius);
                PatternMatch {
                    offset: start,
                    end,
                    matched: text[start..end].to_string(),
                    snippet: text[lo..hi].to_string(),
                    snippet_start: lo,
                }
            })
            .collect()
    }
}

/// Byte bounds of a window of up to `radius` characters on each side of
/// `start..end`, clipped at the text boundaries
fn snippet_bounds(text: &str, start: usize, end: usize, radius: usize) -> (usize, usize) {
    let lo = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(start, |(i, _)| i);
    let hi = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(i, _)| end + i);
    (lo, hi)
}
