use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use thiserror::Error;
use walkdir::WalkDir;

use crate::context::RunContext;

/// Item directory name -> relative paths of regular files beneath it.
pub type LocalFileSet = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Default)]
pub struct LocalTree {
    pub items: LocalFileSet,
    /// Entries whose names are not valid UTF-8. They cannot be compared
    /// against manifest names, so they are reported and never deleted.
    pub skipped: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Walks every immediate subdirectory of `output_dir`. A missing output
/// directory is an empty result: nothing has been downloaded yet.
pub fn scan_local(output_dir: &Path, ctx: &RunContext) -> Result<LocalTree, ScanError> {
    let mut local = LocalTree::default();
    if !output_dir.exists() {
        ctx.warn(format!(
            "output directory does not exist: {}",
            output_dir.display()
        ));
        return Ok(local);
    }

    ctx.info(format!("scanning local directory: {}", output_dir.display()));
    let entries = std::fs::read_dir(output_dir).map_err(|source| ScanError::Io {
        path: output_dir.display().to_string(),
        source,
    })?;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                ctx.warn(format!("skipping unreadable entry: {err}"));
                continue;
            }
        };
        let item_path = entry.path();
        if !item_path.is_dir() {
            continue;
        }
        let Ok(item_id) = entry.file_name().into_string() else {
            ctx.warn(format!(
                "skipping non-UTF-8 directory name: {}",
                item_path.display()
            ));
            local.skipped.push(item_path.display().to_string());
            continue;
        };

        let mut files = BTreeSet::new();
        for walked in WalkDir::new(&item_path).min_depth(1) {
            let walked = match walked {
                Ok(walked) => walked,
                Err(err) => {
                    ctx.warn(format!("skipping unreadable path under {item_id}: {err}"));
                    continue;
                }
            };
            let path = walked.path();
            if !path.is_file() {
                continue;
            }
            let Some(relative) = path
                .strip_prefix(&item_path)
                .ok()
                .and_then(|relative| relative.to_str())
            else {
                ctx.warn(format!("skipping non-UTF-8 file name: {}", path.display()));
                local.skipped.push(path.display().to_string());
                continue;
            };
            files.insert(relative.to_string());
        }
        local.items.insert(item_id, files);
    }

    Ok(local)
}
