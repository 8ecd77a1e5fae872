use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;

use crate::filter::FilterRules;

pub const DEFAULT_ARCHIVE_URL: &str = "https://archive.org";
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingPath(&'static str),
    #[error("invalid filename pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Validated settings for one run. Immutable once built.
#[derive(Debug, Clone)]
pub struct CleanerConfig {
    pub item_list: PathBuf,
    pub output_dir: PathBuf,
    pub filter: FilterRules,
    pub keep_readme: bool,
    pub dry_run: bool,
    /// Leave directories of listed identifiers alone when their manifest
    /// could not be fetched, instead of treating them as orphans.
    pub protect_unresolved: bool,
    pub archive_url: String,
    pub fetch_concurrency: usize,
}

impl CleanerConfig {
    /// Non-destructive defaults: dry-run on, README kept, no filters.
    pub fn new(item_list: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            item_list: item_list.into(),
            output_dir: output_dir.into(),
            filter: FilterRules::default(),
            keep_readme: true,
            dry_run: true,
            protect_unresolved: false,
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

/// Unvalidated user input, as collected from flags and the environment.
#[derive(Debug, Clone)]
pub struct RawConfig {
    pub item_list: Option<String>,
    pub output_dir: Option<String>,
    pub extensions: Option<String>,
    pub filter: Option<String>,
    pub metadata_only: bool,
    pub keep_readme: bool,
    pub dry_run: bool,
    pub protect_unresolved: bool,
    pub archive_url: Option<String>,
    pub fetch_concurrency: Option<usize>,
}

impl Default for RawConfig {
    /// Same non-destructive defaults as [`CleanerConfig::new`].
    fn default() -> Self {
        Self {
            item_list: None,
            output_dir: None,
            extensions: None,
            filter: None,
            metadata_only: false,
            keep_readme: true,
            dry_run: true,
            protect_unresolved: false,
            archive_url: None,
            fetch_concurrency: None,
        }
    }
}

impl RawConfig {
    pub fn validate(self) -> Result<CleanerConfig, ConfigError> {
        let home = dirs::home_dir();
        let item_list = required_path(self.item_list, "item list", home.as_deref())?;
        let output_dir = required_path(self.output_dir, "output directory", home.as_deref())?;
        let filter = FilterRules {
            extensions: self
                .extensions
                .as_deref()
                .map(parse_extensions)
                .unwrap_or_default(),
            pattern: compile_filter(self.filter.as_deref())?,
            metadata_only: self.metadata_only,
        };
        let archive_url = self
            .archive_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_ARCHIVE_URL.to_string());
        let fetch_concurrency = self
            .fetch_concurrency
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_FETCH_CONCURRENCY);

        Ok(CleanerConfig {
            item_list,
            output_dir,
            filter,
            keep_readme: self.keep_readme,
            dry_run: self.dry_run,
            protect_unresolved: self.protect_unresolved,
            archive_url,
            fetch_concurrency,
        })
    }
}

/// Splits a comma-separated suffix list into trimmed, lowercase entries.
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

/// A blank pattern means "no filter".
pub fn compile_filter(pattern: Option<&str>) -> Result<Option<Regex>, ConfigError> {
    match pattern.filter(|p| !p.trim().is_empty()) {
        Some(pattern) => Ok(Some(Regex::new(pattern)?)),
        None => Ok(None),
    }
}

fn required_path(
    value: Option<String>,
    name: &'static str,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingPath(name))?;
    Ok(match home {
        Some(home) => expand_with_home(&value, home),
        None => PathBuf::from(value),
    })
}

pub fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}
