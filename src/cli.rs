//! CLI argument parsing via `clap`.

use clap::Parser;
use std::path::PathBuf;

use bunlock_audit::audit::{DEFAULT_CUTOFF_DATE, DEFAULT_REGISTRY_URL, DEFAULT_WORKERS};

#[derive(Parser, Debug)]
#[command(
    name = "bunlock-audit",
    version,
    about = "Find bun.lock packages released after a specific date",
    long_about = "Extract every pinned package from a bun.lock file, look up when each version was published on the npm registry, and list the ones released after the cutoff date.",
    after_help = "Examples:\n  bunlock-audit bun.lock\n  bunlock-audit bun.lock --date 2025-09-01 --output recent.json --verbose\n  bunlock-audit bun.lock --workers 32"
)]
pub struct Cli {
    /// Path to bun.lock file
    pub lock_file: PathBuf,

    #[arg(
        long,
        default_value = DEFAULT_CUTOFF_DATE,
        help = "Cutoff date in ISO 8601 format (e.g. 2024-01-01). Packages released after this date are listed"
    )]
    pub date: String,

    #[arg(short, long, help = "Output file path (JSON). Prints to stdout when omitted")]
    pub output: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::SetTrue, help = "Show progress messages")]
    pub verbose: bool,

    #[arg(
        long,
        default_value_t = DEFAULT_WORKERS,
        help = "Number of concurrent workers for fetching package data"
    )]
    pub workers: usize,

    #[arg(
        long,
        env = "BUNLOCK_AUDIT_REGISTRY",
        default_value = DEFAULT_REGISTRY_URL,
        help = "npm registry base URL"
    )]
    pub registry: String,

    #[arg(long, default_value_t = 10, help = "Per-request timeout in seconds")]
    pub timeout: u64,
}
