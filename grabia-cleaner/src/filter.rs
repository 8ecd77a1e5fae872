//! Decides which manifest entries count as expected local content.
//!
//! Names flow through a fixed pipeline: drop unlistable entries, neutralize
//! filesystem-unsafe characters, apply the filter rules, then optionally add
//! the synthetic README entry.

use std::collections::BTreeSet;

use grabia_core::ManifestFile;
use regex::Regex;

/// Archive-generated artifacts that are never treated as content.
pub const SYSTEM_FILE_SUFFIXES: [&str; 5] = [
    "_meta.xml",
    "_meta.sqlite",
    "_files.xml",
    "_thumb.jpg",
    "_itemimage.jpg",
];

/// Name of the README the downloader writes next to each item.
pub const README_NAME: &str = "README.txt";

const METADATA_MARKERS: [&str; 4] = [".xml", ".json", ".txt", "readme"];

const UNSAFE_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[derive(Debug, Clone, Default)]
pub struct FilterRules {
    /// Lowercase suffixes; empty means no restriction.
    pub extensions: Vec<String>,
    pub pattern: Option<Regex>,
    pub metadata_only: bool,
}

impl FilterRules {
    pub fn include(&self, filename: &str) -> bool {
        include(filename, self)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.extensions.is_empty() && self.pattern.is_none() && !self.metadata_only
    }
}

/// All active rules must pass; the first failing rule rejects.
pub fn include(filename: &str, rules: &FilterRules) -> bool {
    if is_system_file(filename) {
        return false;
    }

    let lower = filename.to_lowercase();

    if !rules.extensions.is_empty() && !rules.extensions.iter().any(|ext| lower.ends_with(ext)) {
        return false;
    }

    if let Some(pattern) = &rules.pattern
        && !pattern.is_match(filename)
    {
        return false;
    }

    if rules.metadata_only && !METADATA_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return false;
    }

    true
}

pub fn is_system_file(filename: &str) -> bool {
    SYSTEM_FILE_SUFFIXES
        .iter()
        .any(|suffix| filename.ends_with(suffix))
}

/// Replaces every filesystem-unsafe character with `_`. Not path aware: a
/// `/` inside a remote name flattens the name rather than nesting it.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

pub fn expected_names<'a, I>(files: I, rules: &FilterRules, keep_readme: bool) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a ManifestFile>,
{
    let mut names: BTreeSet<String> = files
        .into_iter()
        .filter(|file| file.is_listable())
        .map(|file| sanitize_name(&file.name))
        .filter(|name| rules.include(name))
        .collect();
    if keep_readme {
        names.insert(README_NAME.to_string());
    }
    names
}
