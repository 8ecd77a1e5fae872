use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use grabia_cleaner::{Cleaner, RawConfig, RunContext, RunOutcome, TracingSink};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Keep a download directory in 1:1 parity with archive item manifests.
#[derive(Debug, Parser)]
#[command(name = "grabia-cleaner", version, about)]
struct Args {
    /// Identifier list (plain text, one per line, or CSV/TSV first column)
    #[arg(long, env = "GRABIA_ITEM_LIST")]
    items: Option<String>,

    /// Download directory holding one subdirectory per identifier
    #[arg(long, env = "GRABIA_OUTPUT_DIR")]
    output: Option<String>,

    /// Comma-separated filename suffixes to keep, e.g. "mp3,flac"
    #[arg(long = "ext", env = "GRABIA_EXTENSIONS")]
    extensions: Option<String>,

    /// Regular expression a filename must match (unanchored)
    #[arg(long, env = "GRABIA_FILTER")]
    filter: Option<String>,

    /// Only keep metadata files (xml, json, txt, readme)
    #[arg(long, env = "GRABIA_METADATA_ONLY")]
    metadata_only: bool,

    /// Do not preserve the generated README.txt
    #[arg(long)]
    no_keep_readme: bool,

    /// Actually delete files; without this flag the run is a dry-run preview
    #[arg(long)]
    execute: bool,

    /// Skip the confirmation prompt in execute mode
    #[arg(long, short = 'y')]
    yes: bool,

    /// Archive host serving /metadata/{identifier}
    #[arg(long, env = "GRABIA_ARCHIVE_URL")]
    base_url: Option<String>,

    /// Leave directories of listed items alone when their manifest fetch fails
    #[arg(long, env = "GRABIA_KEEP_UNFETCHED")]
    keep_unfetched: bool,

    /// Parallel manifest fetches
    #[arg(long, env = "GRABIA_FETCH_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Print the run outcome as JSON
    #[arg(long)]
    json: bool,

    /// Debug-level logging unless RUST_LOG says otherwise
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn raw_config(&self) -> RawConfig {
        RawConfig {
            item_list: self.items.clone(),
            output_dir: self.output.clone(),
            extensions: self.extensions.clone(),
            filter: self.filter.clone(),
            metadata_only: self.metadata_only,
            keep_readme: !self.no_keep_readme,
            dry_run: !self.execute,
            protect_unresolved: self.keep_unfetched,
            archive_url: self.base_url.clone(),
            fetch_concurrency: self.concurrency,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

async fn confirm_execute(output_dir: &std::path::Path) -> anyhow::Result<bool> {
    let mut stderr = tokio::io::stderr();
    stderr
        .write_all(
            format!(
                "This will permanently DELETE files under {} that are not in the manifest.\n\
                 Are you sure you want to proceed? [y/N] ",
                output_dir.display()
            )
            .as_bytes(),
        )
        .await?;
    stderr.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("failed to read confirmation")?;
    Ok(is_affirmative(&answer))
}

fn print_summary(outcome: &RunOutcome) {
    let summary = &outcome.summary;
    if outcome.cancelled {
        println!("Stopped during {}.", outcome.last_stage.label());
    }
    match &outcome.deletion {
        None => {
            println!("Dry-run complete!");
            println!("  Files that would be deleted: {}", summary.to_delete);
            println!("  Missing files: {}", summary.missing);
            println!("  Files that would be kept: {}", summary.kept);
            println!("Re-run with --execute to apply.");
        }
        Some(report) => {
            println!("Cleaning complete!");
            println!("  Deleted: {}", report.deleted);
            println!("  Failed: {}", report.failed);
            println!("  Kept: {}", report.kept);
            println!("  Missing files: {}", summary.missing);
        }
    }
    if summary.unresolved > 0 {
        println!("  Items without a manifest: {}", summary.unresolved);
    }
    if summary.rejected > 0 {
        println!("  Local entries skipped: {}", summary.rejected);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args
        .raw_config()
        .validate()
        .context("invalid configuration")?;

    if !config.dry_run && !args.yes && !confirm_execute(&config.output_dir).await? {
        eprintln!("[grabia-cleaner] aborted; nothing was deleted");
        return Ok(());
    }

    let cleaner = Cleaner::new(config).context("failed to set up archive client")?;
    let ctx = RunContext::new(Arc::new(TracingSink));

    let cancel = ctx.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("stop requested; finishing current step");
            cancel.cancel();
        }
    });

    let outcome = cleaner
        .run(&ctx)
        .await
        .context("cleaning run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome);
    }
    Ok(())
}
