//! Expiry sweep
//!
//! Closes IN_PROGRESS jobs that have not been touched for longer than the
//! job timeout, e.g. jobs orphaned by a crashed process. An expired job ends
//! as FAIL with zeroed counters and a single "job expired" error log row.
//! The periodic sweep also drops reference data slots left idle past their TTL.

use super::registry::JobRegistry;
use crate::core::reference_data::ReferenceDataCache;
use crate::core::state::{ErrorLogService, JobExecutionManager};
use crate::domain::{ErrorCode, JobExecutionId, Result};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Expiry sweep
pub struct ExpirySweep {
    jobs: Arc<JobExecutionManager>,
    error_logs: Arc<ErrorLogService>,
    registry: Option<Arc<JobRegistry>>,
    reference_data: Option<Arc<ReferenceDataCache>>,
    timeout_minutes: u64,
}

impl ExpirySweep {
    /// Create a sweep expiring jobs idle for more than `timeout_minutes`
    pub fn new(
        jobs: Arc<JobExecutionManager>,
        error_logs: Arc<ErrorLogService>,
        timeout_minutes: u64,
    ) -> Self {
        Self {
            jobs,
            error_logs,
            registry: None,
            reference_data: None,
            timeout_minutes,
        }
    }

    /// Also stop expired jobs that are still running in this process
    pub fn with_registry(mut self, registry: Arc<JobRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Also evict idle reference data on every periodic tick
    pub fn with_reference_data(mut self, cache: Arc<ReferenceDataCache>) -> Self {
        self.reference_data = Some(cache);
        self
    }

    /// Drop idle reference data slots; returns how many
    pub fn evict_reference_data(&self) -> usize {
        let Some(cache) = &self.reference_data else {
            return 0;
        };
        let evicted = cache.evict_expired();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = cache.len(), "Evicted idle reference data");
        }
        evicted
    }

    /// Run the sweep now
    ///
    /// # Errors
    ///
    /// Returns an error if job or error log state cannot be read or written.
    pub async fn run(&self) -> Result<Vec<JobExecutionId>> {
        self.run_at(Utc::now()).await
    }

    /// Run the sweep as of `now`
    ///
    /// # Errors
    ///
    /// Returns an error if job or error log state cannot be read or written.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<Vec<JobExecutionId>> {
        let timeout = Duration::minutes(i64::try_from(self.timeout_minutes).unwrap_or(i64::MAX));
        let mut expired = Vec::new();

        for candidate in self.jobs.running().await? {
            if !candidate.is_expired(now, timeout) {
                continue;
            }
            // Re-checked under the lock: a chunk may have landed since the query
            let mut update = self.jobs.lock(&candidate.id).await?;
            if !update.job_mut().expire(now, timeout) {
                continue;
            }
            update.save().await?;
            self.error_logs
                .collapse(
                    &candidate.id,
                    ErrorCode::JobExpired,
                    vec![self.timeout_minutes.to_string()],
                )
                .await?;
            let job = update.into_job();
            if let Some(registry) = &self.registry {
                registry.cancel(&job.id);
            }

            tracing::warn!(
                job_execution_id = %job.id,
                last_updated = %job.last_updated_date,
                timeout_minutes = self.timeout_minutes,
                "Job expired"
            );
            expired.push(job.id);
        }

        if !expired.is_empty() {
            tracing::info!(expired = expired.len(), "Expiry sweep closed stale jobs");
        }
        Ok(expired)
    }

    /// Run the sweep every `interval` until `shutdown` turns true
    pub fn spawn_periodic(
        self: Arc<Self>,
        interval: std::time::Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run().await {
                            tracing::error!(error = %e, "Expiry sweep failed");
                        }
                        self.evict_reference_data();
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::catalog::JsonCatalog;
    use crate::adapters::repository::{FileStateStore, Page};
    use crate::domain::{JobStatus, MappingProfile};

    struct Fixture {
        jobs: Arc<JobExecutionManager>,
        logs: Arc<ErrorLogService>,
        sweep: ExpirySweep,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(FileStateStore::in_memory());
        let jobs = Arc::new(JobExecutionManager::new(store.clone()));
        let logs = Arc::new(ErrorLogService::new(store));
        let sweep = ExpirySweep::new(jobs.clone(), logs.clone(), 60);
        Fixture { jobs, logs, sweep }
    }

    #[tokio::test]
    async fn test_expires_stale_job() {
        let f = fixture();
        let job = f
            .jobs
            .create(&MappingProfile::default_instance(), None)
            .await
            .unwrap();
        f.jobs.start(&job.id, 100).await.unwrap();
        f.jobs.add_progress(&job.id, 40, 2, 1).await.unwrap();
        for code in [ErrorCode::ChunkFailed, ErrorCode::SomeRecordsNotFound] {
            f.logs.record(&job.id, code, vec!["x".into()]).await.unwrap();
        }

        let expired = f
            .sweep
            .run_at(Utc::now() + Duration::minutes(61))
            .await
            .unwrap();
        assert_eq!(expired, vec![job.id]);

        let job = f.jobs.get(&job.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Fail);
        assert_eq!(job.progress.exported, 0);
        assert_eq!(job.progress.failed, 0);
        assert_eq!(job.progress.duplicated, 0);
        assert_eq!(job.progress.total, 100);

        let logs = f.logs.logs_for(&job.id, Page::all()).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(
            logs[0].message(),
            "Job expired: no updates for more than 60 minutes"
        );
    }

    #[tokio::test]
    async fn test_late_chunk_does_not_undo_expiry() {
        let f = fixture();
        let job = f
            .jobs
            .create(&MappingProfile::default_instance(), None)
            .await
            .unwrap();
        f.jobs.start(&job.id, 10).await.unwrap();
        f.jobs.add_progress(&job.id, 4, 1, 0).await.unwrap();

        f.sweep
            .run_at(Utc::now() + Duration::hours(2))
            .await
            .unwrap();
        let after = f.jobs.add_progress(&job.id, 3, 2, 0).await.unwrap();

        assert_eq!(after.status, JobStatus::Fail);
        let stored = f.jobs.get(&job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Fail);
        assert_eq!(stored.progress.exported, 0);
        assert_eq!(stored.progress.failed, 0);
        assert_eq!(stored.progress.total, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_reference_data_evicted() {
        let f = fixture();
        let cache = Arc::new(ReferenceDataCache::new(
            Arc::new(JsonCatalog::new()),
            std::time::Duration::from_secs(60),
        ));
        for _ in 0..50 {
            cache.get(&JobExecutionId::generate()).await.unwrap();
        }
        let sweep = f.sweep.with_reference_data(cache.clone());

        assert_eq!(sweep.evict_reference_data(), 0);
        tokio::time::advance(std::time::Duration::from_secs(120)).await;
        assert_eq!(sweep.evict_reference_data(), 50);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_recent_and_closed_jobs_untouched() {
        let f = fixture();
        let profile = MappingProfile::default_instance();
        let recent = f.jobs.create(&profile, None).await.unwrap();
        f.jobs.start(&recent.id, 1).await.unwrap();
        let closed = f.jobs.create(&profile, None).await.unwrap();
        f.jobs.start(&closed.id, 1).await.unwrap();
        f.jobs.finish(&closed.id, JobStatus::Completed).await.unwrap();

        let expired = f
            .sweep
            .run_at(Utc::now() + Duration::minutes(30))
            .await
            .unwrap();
        assert!(expired.is_empty());
        assert_eq!(
            f.jobs.get(&recent.id).await.unwrap().status,
            JobStatus::InProgress
        );
        assert_eq!(
            f.jobs.get(&closed.id).await.unwrap().status,
            JobStatus::Completed
        );
    }
}
