//! Version token extraction and normalization
//!
//! Scanned text units (release tags, page headings, feed entries) carry
//! versions in a handful of common shapes. The extractor tries each pattern
//! in order and the first capture wins within a text unit.

use regex::Regex;

/// Extracts version tokens from free-form text.
pub struct VersionExtractor {
    /// Patterns in priority order: `vX.Y[.Z]`, `version X.Y[.Z]`,
    /// `release X.Y[.Z]`.
    patterns: Vec<Regex>,
}

impl VersionExtractor {
    pub fn new() -> Self {
        Self {
            patterns: vec![
                Regex::new(r"(?i)\bv?(\d+\.\d+(?:\.\d+)?)\b").unwrap(),
                Regex::new(r"(?i)version\s+(\d+\.\d+(?:\.\d+)?)").unwrap(),
                Regex::new(r"(?i)release\s+(\d+\.\d+(?:\.\d+)?)").unwrap(),
            ],
        }
    }

    /// First version token found in `text`, or None.
    pub fn extract(&self, text: &str) -> Option<String> {
        self.patterns
            .iter()
            .find_map(|pattern| pattern.captures(text))
            .map(|captures| captures[1].to_string())
    }
}

impl Default for VersionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a version string for comparison: strip a leading `v`/`V` and
/// drop pre-release suffixes (`-alpha`, `-beta`, `-rc`, `-dev`, case and
/// underscore variants).
pub fn clean_version(version: &str) -> String {
    let trimmed = version.trim().trim_start_matches(['v', 'V']);

    for separator in ['-', '_'] {
        if let Some((base, suffix)) = trimmed.split_once(separator) {
            let suffix = suffix.to_ascii_lowercase();
            if ["alpha", "beta", "rc", "dev"]
                .iter()
                .any(|marker| suffix.starts_with(marker))
            {
                return base.to_string();
            }
        }
    }

    trimmed.to_string()
}
