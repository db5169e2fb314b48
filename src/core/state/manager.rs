//! Job execution manager
//!
//! All JobExecution state changes go through here: creation with the next
//! hrid, start, per-chunk progress, exported files and the single close.
//!
//! Every change is a load-modify-save made under the manager's write lock, so
//! a chunk finishing on one task and the expiry sweep on another never
//! overwrite each other. [`JobExecutionManager::lock`] hands out that lock
//! for callers that must change a job and its error log together.

use crate::adapters::repository::{JobExecutionRepository, Page};
use crate::domain::{
    BibExportError, ExportedFile, JobExecution, JobExecutionId, JobStatus, MappingProfile, Result,
};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Job execution manager
pub struct JobExecutionManager {
    /// Job persistence
    repository: Arc<dyn JobExecutionRepository>,
    /// Held for every load-modify-save
    writes: Mutex<()>,
}

/// A job loaded under the manager's write lock
///
/// Other state changes wait until the update is dropped.
pub struct JobUpdate<'a> {
    repository: &'a dyn JobExecutionRepository,
    job: JobExecution,
    _guard: MutexGuard<'a, ()>,
}

impl JobUpdate<'_> {
    /// The job as loaded, plus any changes made so far
    pub fn job(&self) -> &JobExecution {
        &self.job
    }

    /// Change the job; nothing is written until [`JobUpdate::save`]
    pub fn job_mut(&mut self) -> &mut JobExecution {
        &mut self.job
    }

    /// Write the job, keeping the lock
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn save(&self) -> Result<()> {
        self.repository.update_job(&self.job).await
    }

    /// Release the lock and return the job
    pub fn into_job(self) -> JobExecution {
        self.job
    }
}

impl JobExecutionManager {
    /// Create a new JobExecutionManager
    ///
    /// # Arguments
    ///
    /// * `repository` - Job persistence
    pub fn new(repository: Arc<dyn JobExecutionRepository>) -> Self {
        Self {
            repository,
            writes: Mutex::new(()),
        }
    }

    /// Load a job under the write lock
    ///
    /// # Errors
    ///
    /// Returns [`BibExportError::Repository`] when the job does not exist.
    pub async fn lock(&self, id: &JobExecutionId) -> Result<JobUpdate<'_>> {
        let guard = self.writes.lock().await;
        let job = self.get(id).await?;
        Ok(JobUpdate {
            repository: self.repository.as_ref(),
            job,
            _guard: guard,
        })
    }

    /// Create and persist a NEW job for `profile`
    ///
    /// # Errors
    ///
    /// Returns an error if the hrid cannot be allocated or the job saved.
    pub async fn create(
        &self,
        profile: &MappingProfile,
        run_by: Option<&str>,
    ) -> Result<JobExecution> {
        let hrid = self.repository.next_hrid().await?;
        let mut builder = JobExecution::builder(JobExecutionId::generate())
            .hrid(hrid)
            .job_profile(profile.id.clone(), profile.name.clone());
        if let Some(user) = run_by {
            builder = builder.run_by(user);
        }
        let job = builder.build();
        self.repository.save_job(&job).await?;

        tracing::info!(
            job_execution_id = %job.id,
            hrid = job.hrid,
            profile = %profile.id,
            "Job execution created"
        );
        Ok(job)
    }

    /// Load a job
    ///
    /// # Errors
    ///
    /// Returns [`BibExportError::Repository`] when the job does not exist.
    pub async fn get(&self, id: &JobExecutionId) -> Result<JobExecution> {
        self.repository
            .get_job(id)
            .await?
            .ok_or_else(|| BibExportError::Repository(format!("Job execution {id} not found")))
    }

    /// Load a job if it exists
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn find(&self, id: &JobExecutionId) -> Result<Option<JobExecution>> {
        self.repository.get_job(id).await
    }

    /// Move a job to IN_PROGRESS with the input's total
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be loaded or saved.
    pub async fn start(&self, id: &JobExecutionId, total: u64) -> Result<JobExecution> {
        let mut update = self.lock(id).await?;
        update.job_mut().mark_started(total);
        update.save().await?;
        Ok(update.into_job())
    }

    /// Add one chunk's counters
    ///
    /// A closed job keeps its counters; the job is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be loaded or saved.
    pub async fn add_progress(
        &self,
        id: &JobExecutionId,
        exported: u64,
        failed: u64,
        duplicated: u64,
    ) -> Result<JobExecution> {
        let mut update = self.lock(id).await?;
        if update.job_mut().add_progress(exported, failed, duplicated) {
            update.save().await?;
        } else {
            tracing::debug!(
                job_execution_id = %id,
                status = %update.job().status,
                exported,
                failed,
                "Ignoring progress for a closed job"
            );
        }
        Ok(update.into_job())
    }

    /// Attach an exported file
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be loaded or saved.
    pub async fn add_exported_file(
        &self,
        id: &JobExecutionId,
        file: ExportedFile,
    ) -> Result<JobExecution> {
        let mut update = self.lock(id).await?;
        let job = update.job_mut();
        if !job.exported_files.iter().any(|f| f.file_id == file.file_id) {
            job.exported_files.push(file);
            update.save().await?;
        }
        Ok(update.into_job())
    }

    /// Close a job to a terminal status
    ///
    /// Closing an already closed job is a no-op that returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be loaded or saved.
    pub async fn finish(&self, id: &JobExecutionId, status: JobStatus) -> Result<JobExecution> {
        let mut update = self.lock(id).await?;
        let closed = update.job_mut().finish(status);
        if closed {
            update.save().await?;
        }
        let job = update.into_job();
        if closed {
            tracing::info!(
                job_execution_id = %id,
                status = %status,
                exported = job.progress.exported,
                failed = job.progress.failed,
                "Job execution closed"
            );
        } else {
            tracing::warn!(
                job_execution_id = %id,
                current = %job.status,
                requested = %status,
                "Job execution already closed"
            );
        }
        Ok(job)
    }

    /// Jobs currently IN_PROGRESS
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn running(&self) -> Result<Vec<JobExecution>> {
        self.repository
            .query_jobs(Some(JobStatus::InProgress), Page::all())
            .await
    }

    /// Jobs, optionally filtered by status, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self, status: Option<JobStatus>, page: Page) -> Result<Vec<JobExecution>> {
        self.repository.query_jobs(status, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::repository::FileStateStore;
    use uuid::Uuid;

    fn manager() -> JobExecutionManager {
        JobExecutionManager::new(Arc::new(FileStateStore::in_memory()))
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let manager = manager();
        let profile = MappingProfile::default_instance();
        let job = manager.create(&profile, Some("admin")).await.unwrap();
        assert_eq!(job.status, JobStatus::New);
        assert_eq!(job.hrid, 1);
        assert_eq!(job.run_by.as_deref(), Some("admin"));

        manager.start(&job.id, 10).await.unwrap();
        manager.add_progress(&job.id, 4, 1, 0).await.unwrap();
        let job = manager.add_progress(&job.id, 5, 0, 1).await.unwrap();
        assert_eq!(job.progress.exported, 9);
        assert_eq!(job.progress.failed, 1);
        assert_eq!(job.progress.duplicated, 1);

        let closed = manager
            .finish(&job.id, JobStatus::CompletedWithErrors)
            .await
            .unwrap();
        assert_eq!(closed.status, JobStatus::CompletedWithErrors);
        assert!(closed.completed_date.is_some());
    }

    #[tokio::test]
    async fn test_finish_only_once() {
        let manager = manager();
        let job = manager
            .create(&MappingProfile::default_instance(), None)
            .await
            .unwrap();
        manager.start(&job.id, 1).await.unwrap();
        manager.finish(&job.id, JobStatus::Fail).await.unwrap();
        let again = manager.finish(&job.id, JobStatus::Completed).await.unwrap();
        assert_eq!(again.status, JobStatus::Fail);
    }

    #[tokio::test]
    async fn test_exported_file_added_once() {
        let manager = manager();
        let job = manager
            .create(&MappingProfile::default_instance(), None)
            .await
            .unwrap();
        let file = ExportedFile {
            file_id: Uuid::new_v4(),
            file_name: "ids-1.mrc".into(),
        };
        manager.add_exported_file(&job.id, file.clone()).await.unwrap();
        let job = manager.add_exported_file(&job.id, file).await.unwrap();
        assert_eq!(job.exported_files.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_job() {
        let err = manager().get(&JobExecutionId::generate()).await.unwrap_err();
        assert!(matches!(err, BibExportError::Repository(_)));
    }

    #[tokio::test]
    async fn test_running_lists_in_progress_only() {
        let manager = manager();
        let profile = MappingProfile::default_instance();
        let a = manager.create(&profile, None).await.unwrap();
        manager.create(&profile, None).await.unwrap();
        manager.start(&a.id, 3).await.unwrap();
        let running = manager.running().await.unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, a.id);
    }
}
