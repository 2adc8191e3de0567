//! Runtime settings assembled from the command line.
//!
//! dirsweep has no configuration file. This module holds the pieces of
//! configuration that are parsed and validated once at startup:
//! - [`ExcludeFilter`]: glob patterns for file names to leave in place
//! - [`LogLevel`]: verbosity of diagnostic logging

use clap::ValueEnum;
use glob::Pattern;
use thiserror::Error;

/// Errors raised while validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid glob pattern provided.
    #[error("invalid exclude pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },
}

/// File-name patterns excluded from organization.
///
/// Patterns are matched against the bare file name, not the full path.
///
/// # Examples
///
/// ```
/// use dirsweep::config::ExcludeFilter;
///
/// let filter = ExcludeFilter::from_patterns(["*.part", "Thumbs.db"]).unwrap();
/// assert!(filter.matches("movie.mkv.part"));
/// assert!(filter.matches("Thumbs.db"));
/// assert!(!filter.matches("movie.mkv"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    patterns: Vec<Pattern>,
}

impl ExcludeFilter {
    /// Compiles `patterns` into a filter.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidGlobPattern` for the first pattern that
    /// does not parse.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlobPattern {
                    pattern: pattern.to_string(),
                    reason: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether `file_name` matches any pattern.
    pub fn matches(&self, file_name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(file_name))
    }
}

/// Diagnostic log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    /// Errors only.
    Quiet,
    /// Scheduler cycles, warnings and errors.
    #[default]
    Normal,
    /// Adds per-pass and per-file detail.
    Verbose,
    /// Everything, including name-resolution tracing.
    Debug,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_nothing() {
        let filter = ExcludeFilter::default();
        assert!(!filter.matches("anything.txt"));
    }

    #[test]
    fn test_character_class_pattern() {
        let filter = ExcludeFilter::from_patterns(["[0-9]*.tmp"]).unwrap();
        assert!(filter.matches("1cache.tmp"));
        assert!(!filter.matches("cache.tmp"));
    }

    #[test]
    fn test_single_char_wildcard() {
        let filter = ExcludeFilter::from_patterns(["file?.txt"]).unwrap();
        assert!(filter.matches("file1.txt"));
        assert!(!filter.matches("file12.txt"));
    }

    #[test]
    fn test_invalid_glob_pattern_returns_error() {
        let result = ExcludeFilter::from_patterns(["[invalid"]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidGlobPattern { ref pattern, .. }) if pattern == "[invalid"
        ));
    }

    #[test]
    fn test_default_log_level_is_normal() {
        assert_eq!(LogLevel::default(), LogLevel::Normal);
    }
}
