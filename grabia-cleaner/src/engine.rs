use std::path::PathBuf;

use grabia_core::{ArchiveClient, ArchiveError};
use serde::Serialize;
use thiserror::Error;

use crate::config::CleanerConfig;
use crate::context::RunContext;
use crate::diff::{DiffResult, compute_diff};
use crate::events::RunState;
use crate::identifiers::{IdentifierError, load_identifiers};
use crate::manifest::ManifestFetcher;
use crate::reconcile::{DeletionReport, execute, report_dry_run};
use crate::scan::{ScanError, scan_local};

#[derive(Debug, Error)]
pub enum CleanerError {
    #[error("identifier list error: {0}")]
    Identifiers(#[from] IdentifierError),
    #[error("archive client error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("cannot resolve output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub to_delete: usize,
    pub missing: usize,
    pub kept: usize,
    pub expected_items: usize,
    pub local_items: usize,
    pub unresolved: usize,
    pub rejected: usize,
}

impl From<&DiffResult> for RunSummary {
    fn from(diff: &DiffResult) -> Self {
        Self {
            to_delete: diff.to_delete.len(),
            missing: diff.missing.len(),
            kept: diff.kept,
            expected_items: diff.expected_items,
            local_items: diff.local_items,
            unresolved: diff.unresolved.len(),
            rejected: diff.rejected.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Last stage entered before the run finished.
    pub last_stage: RunState,
    pub cancelled: bool,
    pub dry_run: bool,
    pub summary: RunSummary,
    pub deletion: Option<DeletionReport>,
    pub diff: Option<DiffResult>,
}

impl RunOutcome {
    fn new(last_stage: RunState, dry_run: bool) -> Self {
        Self {
            last_stage,
            cancelled: false,
            dry_run,
            summary: RunSummary::default(),
            deletion: None,
            diff: None,
        }
    }
}

/// One reconciliation run:
/// `Idle -> LoadingIdentifiers -> FetchingManifests -> ScanningLocal ->
/// Diffing -> Reporting | Executing -> Finished`.
pub struct Cleaner {
    config: CleanerConfig,
    fetcher: ManifestFetcher,
}

impl Cleaner {
    pub fn new(config: CleanerConfig) -> Result<Self, CleanerError> {
        let client = ArchiveClient::with_base_url(&config.archive_url)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: CleanerConfig, client: ArchiveClient) -> Self {
        let fetcher = ManifestFetcher::new(client, config.filter.clone(), config.keep_readme)
            .with_concurrency(config.fetch_concurrency);
        Self { config, fetcher }
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    pub async fn run(&self, ctx: &RunContext) -> Result<RunOutcome, CleanerError> {
        let dry_run = self.config.dry_run;
        ctx.info("starting directory cleaning operation");

        ctx.enter(RunState::LoadingIdentifiers);
        let identifiers = load_identifiers(&self.config.item_list)?;
        if identifiers.is_empty() {
            ctx.warn("no identifiers loaded; nothing to do");
            return Ok(self.finish(ctx, RunOutcome::new(RunState::LoadingIdentifiers, dry_run)));
        }
        ctx.success(format!("loaded {} identifiers", identifiers.len()));

        ctx.enter(RunState::FetchingManifests);
        let fetched = self.fetcher.fetch_all(&identifiers, ctx).await;
        if ctx.is_cancelled() {
            return Ok(self.stop(ctx, RunState::FetchingManifests));
        }
        if !fetched.failed.is_empty() {
            let fate = if self.config.protect_unresolved {
                "left untouched"
            } else {
                "treated as orphans"
            };
            ctx.warn(format!(
                "{} identifier(s) without a manifest will be {fate}",
                fetched.failed.len()
            ));
        }

        ctx.enter(RunState::ScanningLocal);
        let root = std::path::absolute(&self.config.output_dir).map_err(|source| {
            CleanerError::OutputDir {
                path: self.config.output_dir.clone(),
                source,
            }
        })?;
        let local = {
            let root = root.clone();
            let scan_ctx = ctx.clone();
            tokio::task::spawn_blocking(move || scan_local(&root, &scan_ctx)).await??
        };
        if ctx.is_cancelled() {
            return Ok(self.stop(ctx, RunState::ScanningLocal));
        }

        ctx.enter(RunState::Diffing);
        ctx.info("calculating differences");
        let mut diff = compute_diff(
            &root,
            &identifiers,
            &fetched.expected,
            &local.items,
            self.config.protect_unresolved,
        );
        diff.rejected.extend(local.skipped);
        for rejected in &diff.rejected {
            ctx.warn(format!("ignoring unmanageable local path: {rejected}"));
        }
        ctx.success("analysis complete");
        ctx.info(format!("  - files to delete: {}", diff.to_delete.len()));
        ctx.info(format!("  - missing files: {}", diff.missing.len()));
        ctx.info(format!("  - files to keep: {}", diff.kept));
        if ctx.is_cancelled() {
            return Ok(self.stop(ctx, RunState::Diffing));
        }

        let mut outcome = if dry_run {
            ctx.enter(RunState::Reporting);
            report_dry_run(&diff, ctx);
            RunOutcome::new(RunState::Reporting, dry_run)
        } else {
            ctx.enter(RunState::Executing);
            ctx.warn("EXECUTING CLEANING OPERATION");
            let report = execute(&diff, &root, ctx).await;
            let mut outcome = RunOutcome::new(RunState::Executing, dry_run);
            outcome.deletion = Some(report);
            outcome.cancelled = ctx.is_cancelled();
            outcome
        };
        outcome.summary = RunSummary::from(&diff);
        outcome.diff = Some(diff);
        Ok(self.finish(ctx, outcome))
    }

    fn stop(&self, ctx: &RunContext, stage: RunState) -> RunOutcome {
        ctx.warn(format!("stopped during {}", stage.label()));
        let mut outcome = RunOutcome::new(stage, self.config.dry_run);
        outcome.cancelled = true;
        self.finish(ctx, outcome)
    }

    fn finish(&self, ctx: &RunContext, outcome: RunOutcome) -> RunOutcome {
        ctx.enter(RunState::Finished);
        if !outcome.cancelled {
            ctx.progress(100);
        }
        outcome
    }
}
