//! Audit module - lockfile freshness analysis.
//!
//! - **Lockfile**: `bun.lock` reading via [`lockfile::parse`]
//! - **Registry**: npm publish-time lookups via [`NpmRegistryClient`]
//! - **Filter**: cutoff comparison via [`filter_after`]
//! - **Pipeline**: async coordinator via [`AuditPipeline`]

pub mod filter;
pub mod lockfile;
pub mod pipeline;
pub mod registry;

pub use filter::{filter_after, parse_instant, FilterError};
pub use lockfile::LockfileError;
pub use pipeline::{
    AuditOutcome, AuditPipeline, AuditStats, PipelineError, DEFAULT_CUTOFF_DATE, DEFAULT_WORKERS,
};
pub use registry::{encode_package_name, NpmRegistryClient, RegistryConfig, DEFAULT_REGISTRY_URL};
