//! Persistence traits for jobs, error logs and mapping profiles

use crate::domain::ids::{JobExecutionId, ProfileId};
use crate::domain::{ErrorCode, ErrorLog, JobExecution, JobStatus, MappingProfile, Result};
use async_trait::async_trait;
use uuid::Uuid;

/// Page of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Rows to skip
    pub offset: usize,
    /// Maximum rows to return
    pub limit: usize,
}

impl Page {
    /// Page starting at `offset`
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Every row
    pub fn all() -> Self {
        Self {
            offset: 0,
            limit: usize::MAX,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, 100)
    }
}

/// Job execution persistence
#[async_trait]
pub trait JobExecutionRepository: Send + Sync {
    /// Load a job
    ///
    /// # Returns
    ///
    /// Returns `Ok(Some(JobExecution))` if found, `Ok(None)` if not found.
    async fn get_job(&self, id: &JobExecutionId) -> Result<Option<JobExecution>>;

    /// Insert or replace a job
    async fn save_job(&self, job: &JobExecution) -> Result<()>;

    /// Replace an existing job
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::BibExportError::Repository`] when the job does
    /// not exist.
    async fn update_job(&self, job: &JobExecution) -> Result<()>;

    /// Delete a job; returns whether it existed
    async fn delete_job(&self, id: &JobExecutionId) -> Result<bool>;

    /// Jobs, optionally filtered by status, newest first
    async fn query_jobs(&self, status: Option<JobStatus>, page: Page) -> Result<Vec<JobExecution>>;

    /// Next human readable job number
    async fn next_hrid(&self) -> Result<u64>;
}

/// Error log persistence
#[async_trait]
pub trait ErrorLogRepository: Send + Sync {
    /// Load one row
    async fn get_log(&self, id: &Uuid) -> Result<Option<ErrorLog>>;

    /// Insert or replace a row
    async fn save_log(&self, log: &ErrorLog) -> Result<()>;

    /// Replace an existing row
    async fn update_log(&self, log: &ErrorLog) -> Result<()>;

    /// Delete one row; returns whether it existed
    async fn delete_log(&self, id: &Uuid) -> Result<bool>;

    /// Rows of a job, oldest first
    async fn query_logs(&self, job_id: &JobExecutionId, page: Page) -> Result<Vec<ErrorLog>>;

    /// First row of a job with the given code
    async fn find_log(&self, job_id: &JobExecutionId, code: ErrorCode) -> Result<Option<ErrorLog>>;

    /// Delete every row of a job; returns how many were removed
    async fn delete_logs_for_job(&self, job_id: &JobExecutionId) -> Result<usize>;
}

/// Mapping profile persistence
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Load a profile
    async fn get_profile(&self, id: &ProfileId) -> Result<Option<MappingProfile>>;

    /// Insert or replace a profile
    async fn save_profile(&self, profile: &MappingProfile) -> Result<()>;

    /// Delete a profile; returns whether it existed
    async fn delete_profile(&self, id: &ProfileId) -> Result<bool>;

    /// Profiles ordered by name
    async fn query_profiles(&self, page: Page) -> Result<Vec<MappingProfile>>;
}
