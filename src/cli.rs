//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use harvester_core::DEFAULT_TRANSIENT_ATTEMPTS;

/// Default base URL of the lookup API.
const DEFAULT_BASE_URL: &str = "http://35.200.185.69:8000";

/// Systematically extract names from a rate-limited autocomplete API.
///
/// Harvester enumerates every one- and two-character query for the selected
/// API version, paces requests against the version's rate budget, and
/// checkpoints after every query so an interrupted run resumes where it
/// left off.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// API version preset to harvest (v1, v2, or v3)
    #[arg(short = 'a', long, default_value = "v1")]
    pub api: String,

    /// Base URL of the lookup API
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Checkpoint file path (defaults to <api>_progress.json)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Output file path (defaults to <api>_names.json)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Override the preset minimum delay between requests, in milliseconds (max 60000)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub min_delay: Option<u64>,

    /// Maximum fetch attempts per query for transient failures (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_TRANSIENT_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: u8,

    /// Abort the run after this many throttled attempts on a single query
    /// (retries without bound when omitted)
    #[arg(long)]
    pub throttle_ceiling: Option<u32>,

    /// Checkpoint after every N completed queries (1-1000)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub checkpoint_every: u32,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
