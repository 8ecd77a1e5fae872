use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::manifest::ExpectedFileSet;
use crate::paths::{item_dir, item_file};
use crate::scan::LocalFileSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// Orphan files first (item order, then name order), then orphan item
    /// directories.
    pub to_delete: Vec<PathBuf>,
    /// `identifier/filename` entries expected but not present locally.
    pub missing: Vec<String>,
    pub kept: usize,
    pub expected_items: usize,
    pub local_items: usize,
    /// Listed identifiers with no manifest.
    pub unresolved: Vec<String>,
    /// Local names that could not be turned into a managed path, or that
    /// are not valid UTF-8. Never deleted.
    pub rejected: Vec<String>,
}

/// Three-way difference between what the manifests expect and what is on
/// disk. Pure: no filesystem access.
///
/// A local directory with no entry in `expected` is scheduled for deletion
/// as a whole and its files are not enumerated. With `protect_unresolved`,
/// directories of listed identifiers whose manifest could not be fetched are
/// left out of the result instead.
pub fn compute_diff(
    output_dir: &Path,
    identifiers: &[String],
    expected: &ExpectedFileSet,
    local: &LocalFileSet,
    protect_unresolved: bool,
) -> DiffResult {
    let listed: HashSet<&str> = identifiers.iter().map(String::as_str).collect();
    let mut result = DiffResult {
        expected_items: expected.len(),
        local_items: local.len(),
        ..DiffResult::default()
    };

    let empty = BTreeSet::new();
    for (item, local_set) in local {
        let Some(expected_set) = expected.get(item) else {
            continue;
        };
        for filename in local_set {
            if expected_set.contains(filename) {
                result.kept += 1;
                continue;
            }
            match item_file(output_dir, item, filename) {
                Ok(path) => result.to_delete.push(path),
                Err(_) => result.rejected.push(format!("{item}/{filename}")),
            }
        }
    }

    for item in local.keys() {
        if expected.contains_key(item) {
            continue;
        }
        if protect_unresolved && listed.contains(item.as_str()) {
            continue;
        }
        match item_dir(output_dir, item) {
            Ok(path) => result.to_delete.push(path),
            Err(_) => result.rejected.push(item.clone()),
        }
    }

    for (item, expected_set) in expected {
        let local_set = local.get(item).unwrap_or(&empty);
        for filename in expected_set {
            if !local_set.contains(filename) {
                result.missing.push(format!("{item}/{filename}"));
            }
        }
    }

    let mut seen = HashSet::new();
    for identifier in identifiers {
        if !expected.contains_key(identifier) && seen.insert(identifier.as_str()) {
            result.unresolved.push(identifier.clone());
        }
    }

    result
}
