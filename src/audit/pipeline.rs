//! End-to-end audit pipeline.
//!
//! This module provides the [`AuditPipeline`] coordinator that runs the
//! stages (Lockfile → Lookup → Filter → Report) with:
//! - Lockfile parsing on a blocking task
//! - Bounded concurrent registry lookups via [`FetchExecutor`]
//! - Structured logging via `tracing`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::audit::filter::filter_after;
use crate::audit::lockfile::{self, LockfileError};
use crate::executor::FetchExecutor;
use crate::model::{ReleaseTimestamp, Report};
use crate::traits::ReleaseLookup;

pub const DEFAULT_CUTOFF_DATE: &str = "2024-01-01";
pub const DEFAULT_WORKERS: usize = 10;

// ============================================================================
// Pipeline Types
// ============================================================================

/// Report plus statistics about how it was produced.
#[derive(Debug)]
pub struct AuditOutcome {
    pub report: Report,
    pub stats: AuditStats,
}

/// Statistics about the audit run.
#[derive(Debug, Default, Clone)]
pub struct AuditStats {
    /// Total time spent on the whole run (milliseconds)
    pub total_duration_ms: u64,

    /// Time spent reading and parsing the lockfile (milliseconds)
    pub parse_duration_ms: u64,

    /// Time spent on registry lookups (milliseconds)
    pub lookup_duration_ms: u64,

    /// Records whose version has no publish time in the registry
    pub unknown_count: usize,

    /// Records whose lookup failed
    pub error_count: usize,
}

/// Errors that abort a run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Lockfile could not be read or decoded
    #[error(transparent)]
    Lockfile(#[from] LockfileError),

    /// Blocking parse task did not complete
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Lockfile audit pipeline.
///
/// # Example
///
/// ```ignore
/// use bunlock_audit::audit::{AuditPipeline, NpmRegistryClient, RegistryConfig};
///
/// let client = NpmRegistryClient::new(RegistryConfig::default())?;
/// let outcome = AuditPipeline::new(client)
///     .with_workers(20)
///     .with_cutoff("2025-01-01")
///     .run("bun.lock".into())
///     .await?;
/// println!("{} newer packages", outcome.report.packages_after_date);
/// ```
pub struct AuditPipeline<L>
where
    L: ReleaseLookup,
{
    /// Registry lookup shared by all worker tasks
    lookup: Arc<L>,

    /// Worker pool size (default: 10)
    workers: usize,

    /// ISO-8601 cutoff (default: 2024-01-01)
    cutoff_date: String,
}

impl<L> AuditPipeline<L>
where
    L: ReleaseLookup + 'static,
{
    pub fn new(lookup: L) -> Self {
        Self::from_shared(Arc::new(lookup))
    }

    pub fn from_shared(lookup: Arc<L>) -> Self {
        Self {
            lookup,
            workers: DEFAULT_WORKERS,
            cutoff_date: DEFAULT_CUTOFF_DATE.to_string(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_cutoff(mut self, cutoff_date: impl Into<String>) -> Self {
        self.cutoff_date = cutoff_date.into();
        self
    }

    pub fn cutoff_date(&self) -> &str {
        &self.cutoff_date
    }

    /// Runs the audit over the lockfile at `lock_file`.
    ///
    /// # Errors
    ///
    /// Only lockfile failures are returned. Lookup failures end up as
    /// `"Error"` records and an invalid cutoff yields an empty report.
    pub async fn run(&self, lock_file: PathBuf) -> Result<AuditOutcome, PipelineError> {
        let start = Instant::now();
        let mut stats = AuditStats::default();

        // ====================================================================
        // Stage 1: Lockfile
        // ====================================================================

        info!(path = %lock_file.display(), "Parsing lockfile");
        let parse_start = Instant::now();

        let packages = tokio::task::spawn_blocking(move || lockfile::parse(&lock_file))
            .await
            .map_err(|e| PipelineError::TaskJoin(e.to_string()))??;

        stats.parse_duration_ms = parse_start.elapsed().as_millis() as u64;
        info!(
            packages = packages.len(),
            duration_ms = stats.parse_duration_ms,
            "Found {} packages",
            packages.len()
        );

        // ====================================================================
        // Stage 2: Registry lookups
        // ====================================================================

        let total_packages = packages.len();
        let lookup_start = Instant::now();

        let records = FetchExecutor::new(self.workers)
            .fetch_all(Arc::clone(&self.lookup), packages)
            .await;

        stats.lookup_duration_ms = lookup_start.elapsed().as_millis() as u64;
        stats.unknown_count = records
            .iter()
            .filter(|r| r.release_date == ReleaseTimestamp::Unknown)
            .count();
        stats.error_count = records
            .iter()
            .filter(|r| r.release_date == ReleaseTimestamp::Error)
            .count();

        info!(
            duration_ms = stats.lookup_duration_ms,
            unknown = stats.unknown_count,
            errors = stats.error_count,
            "Registry lookups completed"
        );

        // ====================================================================
        // Stage 3: Filter and report
        // ====================================================================

        info!("Filtering packages released after {}", self.cutoff_date);
        let kept = filter_after(&records, &self.cutoff_date);
        let report = Report::build(&self.cutoff_date, total_packages, kept);

        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        Ok(AuditOutcome { report, stats })
    }
}

// ============================================================================
// Tests
// ============================================================================
