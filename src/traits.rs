use crate::model::{PackageRecord, PackageRef, ReleaseTimestamp};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Registry returned status {0}")]
    Status(u16),
    #[error("Invalid response body: {0}")]
    InvalidBody(String),
    #[error("Malformed time entry for version {0}")]
    MalformedTime(String),
}

#[async_trait]
pub trait ReleaseLookup: Send + Sync {
    /// Returns the registry this lookup talks to (e.g., "npm").
    fn registry_id(&self) -> &str;

    /// Resolves the publication time of `name@version`.
    ///
    /// `Ok(ReleaseTimestamp::Unknown)` means the registry answered without a
    /// time entry for that version.
    async fn lookup(&self, name: &str, version: &str) -> Result<ReleaseTimestamp, LookupError>;

    /// Runs [`ReleaseLookup::lookup`] and folds any failure into an `"Error"` record.
    async fn fetch(&self, package: &PackageRef) -> PackageRecord {
        let release_date = match self.lookup(&package.name, &package.version).await {
            Ok(ReleaseTimestamp::Unknown) => {
                debug!(registry = self.registry_id(), "? {package}: no release time for version");
                ReleaseTimestamp::Unknown
            }
            Ok(ts) => {
                debug!(registry = self.registry_id(), "✓ {package}");
                ts
            }
            Err(e) => {
                debug!(registry = self.registry_id(), "✗ {package}: {e}");
                ReleaseTimestamp::Error
            }
        };

        PackageRecord::new(package, release_date)
    }
}
