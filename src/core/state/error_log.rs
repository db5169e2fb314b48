//! Error log service
//!
//! Writes the user-visible error trail of a job. Identifier-set codes (not
//! found, invalid, duplicated) are merged into one running row per job; the
//! lookup by `(job, code)` and the update happen under one lock so concurrent
//! chunks of different jobs never create a second row.

use crate::adapters::repository::{ErrorLogRepository, Page};
use crate::core::processor::TranslationFailure;
use crate::domain::{
    AffectedRecord, ErrorCode, ErrorLog, JobExecutionId, LogLevel, MappingError, Result,
};
use std::sync::Arc;
use tokio::sync::Mutex;

const UNKNOWN_HRID: &str = "hrid unknown";
const UNKNOWN_TITLE: &str = "title unknown";

/// Error log service
pub struct ErrorLogService {
    repository: Arc<dyn ErrorLogRepository>,
    merge_lock: Mutex<()>,
}

impl ErrorLogService {
    /// Create a new ErrorLogService
    ///
    /// # Arguments
    ///
    /// * `repository` - Error log persistence
    pub fn new(repository: Arc<dyn ErrorLogRepository>) -> Self {
        Self {
            repository,
            merge_lock: Mutex::new(()),
        }
    }

    /// Record an error, merging identifier-set codes into their running row
    ///
    /// # Errors
    ///
    /// Returns an error if the repository write fails.
    pub async fn record(
        &self,
        job_id: &JobExecutionId,
        code: ErrorCode,
        values: Vec<String>,
    ) -> Result<ErrorLog> {
        if code.is_merged() {
            return self.merge(job_id, code, values).await;
        }
        let log = ErrorLog::new(*job_id, code, values);
        self.repository.save_log(&log).await?;
        Ok(log)
    }

    /// Append `values` to the job's row for `code`, creating it when absent
    ///
    /// # Errors
    ///
    /// Returns an error if the repository lookup or write fails.
    pub async fn merge(
        &self,
        job_id: &JobExecutionId,
        code: ErrorCode,
        values: Vec<String>,
    ) -> Result<ErrorLog> {
        let _guard = self.merge_lock.lock().await;
        match self.repository.find_log(job_id, code).await? {
            Some(mut existing) => {
                existing.error_message_values.extend(values);
                self.repository.update_log(&existing).await?;
                tracing::debug!(
                    job_execution_id = %job_id,
                    code = ?code,
                    values = existing.error_message_values.len(),
                    "Merged error log"
                );
                Ok(existing)
            }
            None => {
                let log = ErrorLog::new(*job_id, code, values);
                self.repository.save_log(&log).await?;
                Ok(log)
            }
        }
    }

    /// Record a record that could not be mapped
    ///
    /// # Errors
    ///
    /// Returns an error if the repository write fails.
    pub async fn record_mapping_failure(
        &self,
        job_id: &JobExecutionId,
        affected: AffectedRecord,
        error: &MappingError,
    ) -> Result<ErrorLog> {
        let log = ErrorLog::new(
            *job_id,
            ErrorCode::ErrorMappingRecord,
            vec![describe(&affected), error.to_string()],
        )
        .with_affected_record(affected);
        self.repository.save_log(&log).await?;
        Ok(log)
    }

    /// Record a value that could not be translated
    ///
    /// The record itself was still exported, so the row is informational.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository write fails.
    pub async fn record_translation_failure(
        &self,
        job_id: &JobExecutionId,
        affected: AffectedRecord,
        failure: &TranslationFailure,
    ) -> Result<ErrorLog> {
        let mut log = ErrorLog::new(
            *job_id,
            ErrorCode::TranslationFailed,
            vec![
                describe(&affected),
                format!("field {}", failure.tag),
                failure.error.to_string(),
            ],
        )
        .with_affected_record(affected);
        log.log_level = LogLevel::Info;
        self.repository.save_log(&log).await?;
        Ok(log)
    }

    /// Replace every row of a job with a single row
    ///
    /// # Errors
    ///
    /// Returns an error if the repository delete or write fails.
    pub async fn collapse(
        &self,
        job_id: &JobExecutionId,
        code: ErrorCode,
        values: Vec<String>,
    ) -> Result<ErrorLog> {
        let _guard = self.merge_lock.lock().await;
        let removed = self.repository.delete_logs_for_job(job_id).await?;
        let log = ErrorLog::new(*job_id, code, values);
        self.repository.save_log(&log).await?;
        tracing::debug!(
            job_execution_id = %job_id,
            removed,
            code = ?code,
            "Collapsed error logs"
        );
        Ok(log)
    }

    /// Rows of a job, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn logs_for(&self, job_id: &JobExecutionId, page: Page) -> Result<Vec<ErrorLog>> {
        self.repository.query_logs(job_id, page).await
    }
}

/// `id (hrid, title)` with placeholders for what could not be determined
fn describe(affected: &AffectedRecord) -> String {
    format!(
        "{} ({}, {})",
        affected.id,
        affected.hrid.as_deref().unwrap_or(UNKNOWN_HRID),
        affected.title.as_deref().unwrap_or(UNKNOWN_TITLE)
    )
}
