//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - console output with env-filtered levels
//! - optional JSON file output with daily or hourly rotation
//!
//! # Example
//!
//! ```no_run
//! use bibexport::logging::init_logging;
//! use bibexport::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the outcome of one chunk
///
/// # Example
///
/// ```no_run
/// use bibexport::log_chunk_processed;
/// use bibexport::domain::JobExecutionId;
///
/// let job_id = JobExecutionId::generate();
/// log_chunk_processed!(&job_id, 1000, 990, 10, false);
/// ```
#[macro_export]
macro_rules! log_chunk_processed {
    ($job_id:expr, $size:expr, $exported:expr, $failed:expr, $last:expr) => {
        tracing::info!(
            job_execution_id = %$job_id,
            chunk_size = $size,
            exported = $exported,
            failed = $failed,
            last = $last,
            "Chunk processed"
        );
    };
}

/// Log the terminal status of a job
///
/// # Example
///
/// ```no_run
/// use bibexport::log_job_finalized;
/// use bibexport::domain::{JobExecution, JobExecutionId};
///
/// let job = JobExecution::builder(JobExecutionId::generate()).build();
/// log_job_finalized!(&job);
/// ```
#[macro_export]
macro_rules! log_job_finalized {
    ($job:expr) => {
        tracing::info!(
            job_execution_id = %$job.id,
            hrid = $job.hrid,
            status = %$job.status,
            total = $job.progress.total,
            exported = $job.progress.exported,
            failed = $job.progress.failed,
            duplicated = $job.progress.duplicated,
            duration_ms = $job.duration().map(|d| d.num_milliseconds()).unwrap_or(0),
            "Job finalized"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::{JobExecution, JobExecutionId, JobStatus};

    #[test]
    fn test_macros_expand() {
        let mut job = JobExecution::builder(JobExecutionId::generate()).hrid(3).build();
        job.mark_started(10);
        job.finish(JobStatus::Completed);
        crate::log_chunk_processed!(&job.id, 10usize, 10u64, 0u64, true);
        crate::log_job_finalized!(&job);
    }
}
