//! Job execution model
//!
//! A job execution is created when an export starts, mutated after every
//! chunk, and closed to a terminal status exactly once.

use super::ids::{JobExecutionId, ProfileId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created, not yet started
    New,
    /// Chunks are being processed
    InProgress,
    /// Every record exported
    Completed,
    /// Some records exported, some failed
    CompletedWithErrors,
    /// Nothing exported, cancelled, expired or failed on the last chunk
    Fail,
}

impl JobStatus {
    /// Returns true for the three terminal statuses
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::CompletedWithErrors | JobStatus::Fail
        )
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::New
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::New => "NEW",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::CompletedWithErrors => "COMPLETED_WITH_ERRORS",
            JobStatus::Fail => "FAIL",
        };
        f.write_str(s)
    }
}

/// Job progress counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Identifiers in the input file
    pub total: u64,
    /// Records written to the output
    pub exported: u64,
    /// Records that failed, were not found, or had invalid identifiers
    pub failed: u64,
    /// Identifiers that resolved to more than one source record
    pub duplicated: u64,
}

/// A file produced by a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFile {
    /// File definition id
    pub file_id: Uuid,
    /// Storage path relative to the output root
    pub file_name: String,
}

/// Job execution record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecution {
    /// Job id
    pub id: JobExecutionId,
    /// Human readable sequence number, used in output file names
    pub hrid: u64,
    /// Current status
    pub status: JobStatus,
    /// Progress counters
    pub progress: Progress,
    /// When the job moved to IN_PROGRESS
    pub started_date: Option<DateTime<Utc>>,
    /// When the job reached a terminal status
    pub completed_date: Option<DateTime<Utc>>,
    /// Last time the orchestrator touched this job
    pub last_updated_date: DateTime<Utc>,
    /// Files produced by this job
    #[serde(default)]
    pub exported_files: Vec<ExportedFile>,
    /// Job profile id
    pub job_profile_id: Option<ProfileId>,
    /// Job profile name
    pub job_profile_name: Option<String>,
    /// User that started the job
    pub run_by: Option<String>,
}

impl JobExecution {
    /// Creates a new builder
    pub fn builder(id: JobExecutionId) -> JobExecutionBuilder {
        JobExecutionBuilder::new(id)
    }

    /// Move the job to IN_PROGRESS with the input's total count
    pub fn mark_started(&mut self, total: u64) {
        let now = Utc::now();
        self.status = JobStatus::InProgress;
        self.progress.total = total;
        self.started_date = Some(now);
        self.last_updated_date = now;
    }

    /// Add one chunk's counters to the running progress
    ///
    /// Returns false, leaving the job untouched, when it was already closed.
    pub fn add_progress(&mut self, exported: u64, failed: u64, duplicated: u64) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.progress.exported += exported;
        self.progress.failed += failed;
        self.progress.duplicated += duplicated;
        self.last_updated_date = Utc::now();
        true
    }

    /// Close an IN_PROGRESS job idle for longer than `timeout` as FAIL
    ///
    /// Counters are zeroed except `total`, so a late resume cannot count a
    /// record twice. Returns false when the job is not expired.
    pub fn expire(&mut self, now: DateTime<Utc>, timeout: Duration) -> bool {
        if !self.is_expired(now, timeout) {
            return false;
        }
        self.progress = Progress {
            total: self.progress.total,
            ..Progress::default()
        };
        self.finish(JobStatus::Fail)
    }

    /// Close the job to a terminal status
    ///
    /// Returns false, leaving the job untouched, when it was already closed.
    pub fn finish(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        let now = Utc::now();
        self.status = status;
        self.completed_date = Some(now);
        self.last_updated_date = now;
        true
    }

    /// Returns true when the job is IN_PROGRESS and untouched for longer than `timeout`
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.status == JobStatus::InProgress && now - self.last_updated_date > timeout
    }

    /// Duration between start and completion, when both are known
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_date, self.completed_date) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Decide the terminal status of a job from its final counters
///
/// Zero exported records fail the job unless an output file was produced
/// anyway, in which case the job completed with errors.
pub fn final_status(exported: u64, failed: u64, output_exists: bool) -> JobStatus {
    if exported == 0 {
        if output_exists {
            JobStatus::CompletedWithErrors
        } else {
            JobStatus::Fail
        }
    } else if failed > 0 {
        JobStatus::CompletedWithErrors
    } else {
        JobStatus::Completed
    }
}

/// Builder for JobExecution
pub struct JobExecutionBuilder {
    id: JobExecutionId,
    hrid: u64,
    job_profile_id: Option<ProfileId>,
    job_profile_name: Option<String>,
    run_by: Option<String>,
}

impl JobExecutionBuilder {
    /// Create a new builder
    pub fn new(id: JobExecutionId) -> Self {
        Self {
            id,
            hrid: 0,
            job_profile_id: None,
            job_profile_name: None,
            run_by: None,
        }
    }

    /// Set the hrid
    pub fn hrid(mut self, hrid: u64) -> Self {
        self.hrid = hrid;
        self
    }

    /// Set the job profile
    pub fn job_profile(mut self, id: ProfileId, name: impl Into<String>) -> Self {
        self.job_profile_id = Some(id);
        self.job_profile_name = Some(name.into());
        self
    }

    /// Set the user running the job
    pub fn run_by(mut self, user: impl Into<String>) -> Self {
        self.run_by = Some(user.into());
        self
    }

    /// Build the JobExecution in status NEW
    pub fn build(self) -> JobExecution {
        JobExecution {
            id: self.id,
            hrid: self.hrid,
            status: JobStatus::New,
            progress: Progress::default(),
            started_date: None,
            completed_date: None,
            last_updated_date: Utc::now(),
            exported_files: Vec::new(),
            job_profile_id: self.job_profile_id,
            job_profile_name: self.job_profile_name,
            run_by: self.run_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let job = JobExecution::builder(JobExecutionId::generate()).hrid(7).build();
        assert_eq!(job.status, JobStatus::New);
        assert_eq!(job.hrid, 7);
        assert_eq!(job.progress, Progress::default());
        assert!(job.started_date.is_none());
    }

    #[test]
    fn test_finish_only_once() {
        let mut job = JobExecution::builder(JobExecutionId::generate()).build();
        job.mark_started(10);
        assert!(job.finish(JobStatus::Completed));
        assert!(!job.finish(JobStatus::Fail));
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.duration().is_some());
    }

    #[test]
    fn test_is_expired() {
        let mut job = JobExecution::builder(JobExecutionId::generate()).build();
        job.mark_started(1);
        job.last_updated_date = Utc::now() - Duration::minutes(90);
        assert!(job.is_expired(Utc::now(), Duration::minutes(60)));
        assert!(!job.is_expired(Utc::now(), Duration::minutes(120)));

        job.finish(JobStatus::Completed);
        assert!(!job.is_expired(Utc::now(), Duration::minutes(60)));
    }

    #[test]
    fn test_closed_job_ignores_progress() {
        let mut job = JobExecution::builder(JobExecutionId::generate()).build();
        job.mark_started(10);
        assert!(job.add_progress(4, 1, 0));
        job.finish(JobStatus::Fail);

        assert!(!job.add_progress(3, 2, 1));
        assert_eq!(job.progress.exported, 4);
        assert_eq!(job.progress.failed, 1);
        assert_eq!(job.progress.duplicated, 0);
    }

    #[test]
    fn test_expire_zeroes_counters_and_fails_once() {
        let mut job = JobExecution::builder(JobExecutionId::generate()).build();
        job.mark_started(10);
        job.add_progress(4, 1, 1);
        let later = Utc::now() + Duration::minutes(61);

        assert!(!job.expire(Utc::now(), Duration::minutes(60)));
        assert!(job.expire(later, Duration::minutes(60)));
        assert_eq!(job.status, JobStatus::Fail);
        assert_eq!(
            job.progress,
            Progress {
                total: 10,
                ..Progress::default()
            }
        );
        assert!(!job.expire(later, Duration::minutes(60)));
    }

    #[test]
    fn test_final_status_table() {
        assert_eq!(final_status(0, 0, false), JobStatus::Fail);
        assert_eq!(final_status(0, 5, true), JobStatus::CompletedWithErrors);
        assert_eq!(final_status(10, 0, true), JobStatus::Completed);
        assert_eq!(final_status(8, 2, true), JobStatus::CompletedWithErrors);
    }

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&JobStatus::CompletedWithErrors).unwrap();
        assert_eq!(json, "\"COMPLETED_WITH_ERRORS\"");
        assert_eq!(JobStatus::InProgress.to_string(), "IN_PROGRESS");
    }
}
