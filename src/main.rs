//! CLI entry point for the harvester tool.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::{
    ApiVersion, BackoffPolicy, EngineError, FileStore, HarvestEngine, HttpFetcher,
    ProgressReporter, space_size,
};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

/// Progress reporter backed by an indicatif bar.
struct BarReporter {
    bar: ProgressBar,
}

impl ProgressReporter for BarReporter {
    fn on_query(&self, done: usize, total: usize, query: &str, names: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(done as u64);
        self.bar.set_message(format!("{query:?} ({names} names)"));
    }
}

fn make_progress_bar(quiet: bool, total: usize) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{bar:40} {pos}/{len} queries {msg}")
    {
        bar.set_style(style);
    }
    bar
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let version: ApiVersion = args
        .api
        .parse()
        .with_context(|| format!("unrecognized --api value {:?}", args.api))?;

    let mut spec = version.spec();
    if let Some(delay_ms) = args.min_delay {
        spec = spec.with_min_delay(Duration::from_millis(delay_ms));
        debug!(delay_ms, "minimum delay overridden");
    }

    let checkpoint_path = args
        .checkpoint
        .unwrap_or_else(|| format!("{version}_progress.json").into());
    let output_path = args
        .output
        .unwrap_or_else(|| format!("{version}_names.json").into());

    info!(
        %version,
        queries = space_size(&spec),
        delay_ms = spec.min_delay().as_millis(),
        checkpoint = %checkpoint_path.display(),
        output = %output_path.display(),
        "Harvester starting"
    );

    let fetcher = HttpFetcher::new(&args.base_url, version)?;
    let store = FileStore::new(&checkpoint_path);

    let mut policy =
        BackoffPolicy::new(spec.min_delay()).with_transient_attempts(u32::from(args.max_retries));
    if let Some(ceiling) = args.throttle_ceiling {
        policy = policy.with_throttle_ceiling(ceiling);
    }

    // Ctrl-C flips the shutdown flag; the engine checkpoints and exits at
    // its next suspension point.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing current query and checkpointing");
            let _ = shutdown_tx.send(true);
        }
    });

    let bar = make_progress_bar(args.quiet, space_size(&spec));
    let engine = HarvestEngine::new(policy, shutdown_rx)
        .with_checkpoint_every(args.checkpoint_every)
        .with_reporter(Box::new(BarReporter { bar: bar.clone() }));

    let report = match engine
        .run(&spec, &fetcher, &store, Some(&output_path))
        .await
    {
        Ok(report) => report,
        Err(e @ EngineError::ThrottleExhausted { .. }) => {
            bar.abandon();
            warn!("progress up to the aborted query was checkpointed");
            return Err(e.into());
        }
        Err(e) => {
            bar.abandon();
            return Err(e.into());
        }
    };
    bar.finish_and_clear();

    info!(
        completed = report.stats.completed(),
        failed = report.stats.failed(),
        retried = report.stats.retried(),
        names = report.stats.names_discovered(),
        "Harvest complete"
    );

    if report.stats.interrupted() {
        info!(
            checkpoint = %checkpoint_path.display(),
            "interrupted before the query space was exhausted; rerun to resume"
        );
    }

    Ok(())
}
