use std::io;
use std::path::Path;

use serde::Serialize;

use crate::context::RunContext;
use crate::diff::DiffResult;
use crate::paths::is_within;

/// Entries shown per list in a dry-run report.
pub const PREVIEW_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub deleted: usize,
    pub failed: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    File,
    Directory,
    Vanished,
}

/// First `limit` entries plus how many were left out.
pub fn preview<T>(entries: &[T], limit: usize) -> (&[T], usize) {
    let shown = entries.len().min(limit);
    (&entries[..shown], entries.len() - shown)
}

/// Report mode: describes the would-be changes and touches nothing.
pub fn report_dry_run(diff: &DiffResult, ctx: &RunContext) {
    ctx.warn("DRY-RUN MODE - no files will be deleted");

    if !diff.to_delete.is_empty() {
        ctx.warn(format!(
            "files that WOULD BE DELETED ({}):",
            diff.to_delete.len()
        ));
        let (shown, remaining) = preview(&diff.to_delete, PREVIEW_LIMIT);
        for path in shown {
            ctx.warn(format!("  - {}", path.display()));
        }
        if remaining > 0 {
            ctx.warn(format!("  ... and {remaining} more"));
        }
    }

    if !diff.missing.is_empty() {
        ctx.info(format!(
            "missing files (not in local directory) ({}):",
            diff.missing.len()
        ));
        let (shown, remaining) = preview(&diff.missing, PREVIEW_LIMIT);
        for entry in shown {
            ctx.info(format!("  - {entry}"));
        }
        if remaining > 0 {
            ctx.info(format!("  ... and {remaining} more"));
        }
    }

    ctx.success("dry-run complete; run with --execute to make changes");
}

/// Execute mode: removes every scheduled path in order. A failure is logged
/// and counted and the loop moves on; a cancel stops further deletions
/// without undoing earlier ones. Progress spans 50..100.
pub async fn execute(diff: &DiffResult, root: &Path, ctx: &RunContext) -> DeletionReport {
    let mut report = DeletionReport {
        kept: diff.kept,
        ..DeletionReport::default()
    };
    let total = diff.to_delete.len();

    for (idx, path) in diff.to_delete.iter().enumerate() {
        if ctx.is_cancelled() {
            ctx.warn(format!(
                "stopping: {} path(s) left unprocessed",
                total - idx
            ));
            break;
        }
        ctx.progress(50 + ((idx * 50) / total.max(1)) as u8);

        if !is_within(root, path) {
            ctx.error(format!(
                "refusing to delete {} outside {}",
                path.display(),
                root.display()
            ));
            report.failed += 1;
            continue;
        }

        match remove_path(path).await {
            Ok(Removal::File) => {
                ctx.info(format!("deleted file: {}", path.display()));
                report.deleted += 1;
            }
            Ok(Removal::Directory) => {
                ctx.info(format!("deleted directory: {}", path.display()));
                report.deleted += 1;
            }
            Ok(Removal::Vanished) => {
                ctx.info(format!("already gone: {}", path.display()));
            }
            Err(err) => {
                ctx.error(format!("failed to delete {}: {err}", path.display()));
                report.failed += 1;
            }
        }
    }

    ctx.success(format!("deleted: {} item(s)", report.deleted));
    if report.failed > 0 {
        ctx.error(format!("failed: {} item(s)", report.failed));
    } else {
        ctx.info("failed: 0 item(s)");
    }
    ctx.success(format!("kept: {} file(s)", report.kept));
    report
}

/// Directories go recursively; files and symlinks are unlinked without
/// following them.
async fn remove_path(path: &Path) -> io::Result<Removal> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Removal::Vanished),
        Err(err) => return Err(err),
    };
    if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await?;
        Ok(Removal::Directory)
    } else {
        tokio::fs::remove_file(path).await?;
        Ok(Removal::File)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::recording_context;
    use crate::events::{EventSink, Level, RunEvent};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    fn diff_with(to_delete: Vec<PathBuf>, kept: usize) -> DiffResult {
        DiffResult {
            to_delete,
            kept,
            ..DiffResult::default()
        }
    }

    #[test]
    fn preview_truncates_and_counts_rest() {
        let entries: Vec<u32> = (0..120).collect();
        let (shown, remaining) = preview(&entries, PREVIEW_LIMIT);
        assert_eq!(shown.len(), 50);
        assert_eq!(remaining, 70);

        let (shown, remaining) = preview(&entries[..3], PREVIEW_LIMIT);
        assert_eq!(shown, &[0, 1, 2]);
        assert_eq!(remaining, 0);
    }

    #[test]
    fn dry_run_report_touches_nothing() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("item1/b.txt");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, b"b").unwrap();
        let to_delete: Vec<PathBuf> = std::iter::once(file.clone())
            .chain((0..60).map(|i| dir.path().join(format!("ghost{i}"))))
            .collect();

        let (ctx, sink) = recording_context();
        report_dry_run(&diff_with(to_delete, 0), &ctx);

        assert!(file.exists());
        let warnings = sink.messages(Level::Warning);
        assert!(warnings.iter().any(|m| m == "  ... and 11 more"));
        assert_eq!(
            warnings.iter().filter(|m| m.starts_with("  - ")).count(),
            PREVIEW_LIMIT
        );
    }

    #[tokio::test]
    async fn execute_removes_files_and_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("item1")).unwrap();
        std::fs::create_dir_all(root.join("item2/nested")).unwrap();
        std::fs::write(root.join("item1/b.txt"), b"b").unwrap();
        std::fs::write(root.join("item1/a.txt"), b"a").unwrap();
        std::fs::write(root.join("item2/nested/x.bin"), b"x").unwrap();

        let (ctx, sink) = recording_context();
        let report = execute(
            &diff_with(vec![root.join("item1/b.txt"), root.join("item2")], 1),
            root,
            &ctx,
        )
        .await;

        assert_eq!(
            report,
            DeletionReport {
                deleted: 2,
                failed: 0,
                kept: 1
            }
        );
        assert!(!root.join("item1/b.txt").exists());
        assert!(root.join("item1/a.txt").exists());
        assert!(!root.join("item2").exists());
        assert_eq!(sink.progress(), vec![50, 75]);
    }

    #[tokio::test]
    async fn execute_isolates_failures_and_refuses_outside_paths() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let root = dir.path().join("downloads");
        std::fs::create_dir_all(root.join("item1")).unwrap();
        std::fs::write(root.join("item1/b.txt"), b"b").unwrap();
        std::fs::write(outside.path().join("keep.txt"), b"k").unwrap();

        let (ctx, _sink) = recording_context();
        let report = execute(
            &diff_with(
                vec![
                    outside.path().join("keep.txt"),
                    root.join("item1/vanished.txt"),
                    root.join("item1/b.txt"),
                ],
                0,
            ),
            &root,
            &ctx,
        )
        .await;

        assert_eq!(report.deleted, 1);
        assert_eq!(report.failed, 1);
        assert!(outside.path().join("keep.txt").exists());
        assert!(!root.join("item1/b.txt").exists());
    }

    #[tokio::test]
    async fn cancelled_execute_deletes_nothing_further() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("item1")).unwrap();
        std::fs::write(root.join("item1/b.txt"), b"b").unwrap();

        let (ctx, sink) = recording_context();
        ctx.cancel();
        let report = execute(&diff_with(vec![root.join("item1/b.txt")], 3), root, &ctx).await;

        assert_eq!(report.deleted, 0);
        assert_eq!(report.kept, 3);
        assert!(root.join("item1/b.txt").exists());
        assert!(
            sink.messages(Level::Warning)
                .iter()
                .any(|m| m.starts_with("stopping"))
        );
    }

    /// Cancels the run as soon as the first deletion is reported.
    struct CancelOnDelete(CancellationToken);

    impl EventSink for CancelOnDelete {
        fn emit(&self, event: RunEvent) {
            if let RunEvent::Log { message, .. } = event
                && message.starts_with("deleted")
            {
                self.0.cancel();
            }
        }
    }

    #[tokio::test]
    async fn cancel_mid_execute_stops_after_current_path() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("item1")).unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            std::fs::write(root.join("item1").join(name), b"x").unwrap();
        }

        let token = CancellationToken::new();
        let ctx = RunContext::with_cancel(Arc::new(CancelOnDelete(token.clone())), token);
        let paths = vec![
            root.join("item1/a.txt"),
            root.join("item1/b.txt"),
            root.join("item1/c.txt"),
        ];
        let report = execute(&diff_with(paths, 0), root, &ctx).await;

        assert!(ctx.is_cancelled());
        assert_eq!(report.deleted, 1);
        assert_eq!(report.failed, 0);
        assert!(!root.join("item1/a.txt").exists());
        assert!(root.join("item1/b.txt").exists());
        assert!(root.join("item1/c.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_directory_is_unlinked_not_followed() {
        let dir = tempdir().unwrap();
        let target = tempdir().unwrap();
        std::fs::write(target.path().join("precious.txt"), b"p").unwrap();
        let root = dir.path();
        std::os::unix::fs::symlink(target.path(), root.join("linked")).unwrap();

        let (ctx, _sink) = recording_context();
        let report = execute(&diff_with(vec![root.join("linked")], 0), root, &ctx).await;

        assert_eq!(report.deleted, 1);
        assert!(!root.join("linked").exists());
        assert!(target.path().join("precious.txt").exists());
    }
}
