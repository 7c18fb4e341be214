use crate::model::{PackageRecord, PackageRef};
use crate::traits::ReleaseLookup;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

const PROGRESS_EVERY: usize = 10;

/// Runs registry lookups over a bounded pool of concurrent tasks.
pub struct FetchExecutor {
    semaphore: Arc<Semaphore>,
    max_workers: usize,
}

impl FetchExecutor {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Looks up every ref and returns one record per ref, in completion order.
    ///
    /// A task that panics or is cancelled is replaced by an `"Error"` record
    /// for its ref, so the output length always equals the input length.
    #[instrument(skip_all, fields(registry = lookup.registry_id(), packages = refs.len()))]
    pub async fn fetch_all<L>(&self, lookup: Arc<L>, refs: Vec<PackageRef>) -> Vec<PackageRecord>
    where
        L: ReleaseLookup + ?Sized + 'static,
    {
        if refs.is_empty() {
            return Vec::new();
        }

        let total = refs.len();
        debug!(
            "Fetching release dates for {} packages using {} concurrent workers",
            total, self.max_workers
        );

        let mut tasks = JoinSet::new();
        let mut pending = HashMap::with_capacity(total);

        for package in refs {
            let lookup = Arc::clone(&lookup);
            let semaphore = Arc::clone(&self.semaphore);
            let task_package = package.clone();

            let handle = tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        warn!("Worker pool closed before {task_package}: {e}");
                        return PackageRecord::error(&task_package);
                    }
                };
                lookup.fetch(&task_package).await
            });
            pending.insert(handle.id(), package);
        }

        let mut records = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, record)) => {
                    pending.remove(&id);
                    records.push(record);
                }
                Err(e) => {
                    if let Some(package) = pending.remove(&e.id()) {
                        warn!("Error processing {package}: {e}");
                        records.push(PackageRecord::error(&package));
                    }
                }
            }

            let completed = records.len();
            if completed % PROGRESS_EVERY == 0 {
                debug!(completed, total, "Progress: {completed}/{total} packages fetched");
            }
        }

        debug!("Completed fetching all {total} packages");
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReleaseTimestamp;
    use crate::traits::LookupError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every lookup with a fixed timestamp, panicking for `failing-package`.
    #[derive(Default)]
    struct MockLookup {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ReleaseLookup for MockLookup {
        fn registry_id(&self) -> &str {
            "mock"
        }

        async fn lookup(
            &self,
            name: &str,
            _version: &str,
        ) -> Result<ReleaseTimestamp, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if name == "failing-package" {
                panic!("Test error");
            }
            if name == "gone" {
                return Err(LookupError::Status(404));
            }
            Ok(ReleaseTimestamp::Published("2024-01-01T00:00:00.000Z".into()))
        }
    }

    fn refs(names: &[&str]) -> Vec<PackageRef> {
        names.iter().map(|n| PackageRef::new(*n, "1.0.0")).collect()
    }

    #[tokio::test]
    async fn test_fetch_all_empty_issues_no_requests() {
        let lookup = Arc::new(MockLookup::default());
        let records = FetchExecutor::new(2).fetch_all(Arc::clone(&lookup), Vec::new()).await;

        assert!(records.is_empty());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_all_returns_one_record_per_ref() {
        let lookup = Arc::new(MockLookup::default());
        let records = FetchExecutor::new(2)
            .fetch_all(Arc::clone(&lookup), refs(&["react", "lodash"]))
            .await;

        assert_eq!(records.len(), 2);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_all_substitutes_error_for_faulted_task() {
        let lookup = Arc::new(MockLookup::default());
        let records = FetchExecutor::new(2)
            .fetch_all(lookup, refs(&["react", "failing-package", "gone", "lodash"]))
            .await;

        assert_eq!(records.len(), 4);

        let failing = records.iter().find(|r| r.name == "failing-package").unwrap();
        assert_eq!(failing.release_date, ReleaseTimestamp::Error);
        let gone = records.iter().find(|r| r.name == "gone").unwrap();
        assert_eq!(gone.release_date, ReleaseTimestamp::Error);

        let ok = records.iter().filter(|r| !r.release_date.is_sentinel()).count();
        assert_eq!(ok, 2);
    }

    #[tokio::test]
    async fn test_fetch_all_respects_worker_limit() {
        let lookup = Arc::new(MockLookup::default());
        let names: Vec<String> = (0..25).map(|i| format!("pkg-{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let records = FetchExecutor::new(3)
            .fetch_all(Arc::clone(&lookup), refs(&names))
            .await;

        assert_eq!(records.len(), 25);
        assert!(lookup.peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_zero_workers_is_clamped() {
        assert_eq!(FetchExecutor::new(0).max_workers(), 1);
    }
}
