//! Configuration for tree building and rendering.
//!
//! Values come from built-in defaults, optionally overridden by a TOML file
//! and then by command-line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CovtreeError, Result};

/// Default excluded path markers: vendored third-party code.
pub const DEFAULT_EXCLUDED_MARKERS: &[&str] = &["contrib/", "base/"];

/// Default source root marker.
pub const DEFAULT_ROOT_MARKER: &str = "src/";

/// How a percentage compares against a metric's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageLevel {
    High,
    Medium,
    Low,
}

/// `[high, medium]` thresholds for one metric, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Threshold {
    pub high: u64,
    pub medium: u64,
}

impl Threshold {
    pub const fn new(high: u64, medium: u64) -> Self {
        Self { high, medium }
    }

    #[must_use]
    pub fn classify(&self, percent: u64) -> CoverageLevel {
        if percent >= self.high {
            CoverageLevel::High
        } else if percent >= self.medium {
            CoverageLevel::Medium
        } else {
            CoverageLevel::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Bounds {
    pub lines: Threshold,
    pub functions: Threshold,
    pub tests: Threshold,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            lines: Threshold::new(90, 75),
            functions: Threshold::new(90, 75),
            tests: Threshold::new(50, 15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// A file whose path contains any of these is dropped entirely.
    pub excluded_markers: Vec<String>,
    /// Everything up to and including the first occurrence is the on-disk
    /// prefix; the rest is the displayed path.
    pub root_marker: String,
    /// Overrides the prefix derived from `root_marker` when locating
    /// source files.
    pub source_root: Option<PathBuf>,
    pub bounds: Bounds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            excluded_markers: DEFAULT_EXCLUDED_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            root_marker: DEFAULT_ROOT_MARKER.to_string(),
            source_root: None,
            bounds: Bounds::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_markers
            .iter()
            .any(|marker| !marker.is_empty() && path.contains(marker.as_str()))
    }

    /// Split `path` at the first occurrence of the root marker into
    /// `(prefix, stripped_path)`. Without a match the prefix is empty.
    #[must_use]
    pub fn split_root<'a>(&self, path: &'a str) -> (&'a str, &'a str) {
        if self.root_marker.is_empty() {
            return ("", path);
        }
        match path.find(self.root_marker.as_str()) {
            Some(pos) => path.split_at(pos + self.root_marker.len()),
            None => ("", path),
        }
    }
}

/// Load and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    let Bounds {
        lines,
        functions,
        tests,
    } = config.bounds;
    for (name, threshold) in [("lines", lines), ("functions", functions), ("tests", tests)] {
        if threshold.high > 100 || threshold.medium > threshold.high {
            return Err(CovtreeError::InvalidConfig(format!(
                "bounds.{name} must satisfy 0 <= medium <= high <= 100, got high={} medium={}",
                threshold.high, threshold.medium
            )));
        }
    }
    Ok(())
}
