//! bunlock-audit: list bun.lock dependencies published after a cutoff date.

mod cli;

use anyhow::{Context, Result};
use bunlock_audit::audit::{AuditPipeline, NpmRegistryClient, RegistryConfig};
use clap::Parser;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let default_filter = format!("{}={level},warn", env!("CARGO_CRATE_NAME"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or(default_filter),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = RegistryConfig::default()
        .with_base_url(cli.registry.clone())
        .with_timeout(Duration::from_secs(cli.timeout));
    let client = NpmRegistryClient::new(config).context("Failed to build registry client")?;
    debug!(
        registry = %client.config().base_url,
        timeout_secs = client.config().timeout.as_secs(),
        "Using registry"
    );

    let outcome = AuditPipeline::new(client)
        .with_workers(cli.workers)
        .with_cutoff(cli.date.clone())
        .run(cli.lock_file.clone())
        .await
        .with_context(|| format!("Failed to audit {}", cli.lock_file.display()))?;

    let json = serde_json::to_string_pretty(&outcome.report)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Results written to {}", path.display());
        }
        None => println!("{json}"),
    }

    let report = &outcome.report;
    info!(
        total = report.total_packages,
        after_date = report.packages_after_date,
        unknown = outcome.stats.unknown_count,
        errors = outcome.stats.error_count,
        "Summary: {} of {} packages released after {}",
        report.packages_after_date,
        report.total_packages,
        report.cutoff_date
    );
    debug!(duration_ms = outcome.stats.total_duration_ms, "Done");

    Ok(())
}
