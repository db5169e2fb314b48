//! Job error log model
//!
//! Error logs are the user-visible trail of a job. Codes that describe sets of
//! identifiers (not found, duplicated, invalid) keep one running row per job
//! whose values grow chunk by chunk.

use super::ids::JobExecutionId;
use super::profile::RecordType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error message code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    /// Identifiers with no catalog record
    SomeRecordsNotFound,
    /// Identifiers that are not UUIDs
    InvalidUuidFormat,
    /// Identifiers resolving to more than one stored MARC record
    DuplicateSrsRecord,
    /// One record could not be mapped
    ErrorMappingRecord,
    /// One value could not be translated
    TranslationFailed,
    /// The input file was empty or could not be read
    EmptyInput,
    /// One chunk failed on an infrastructure error
    ChunkFailed,
    /// No record was exported
    NothingToExport,
    /// The job was cancelled
    JobCancelled,
    /// The job was expired by the sweep
    JobExpired,
}

impl ErrorCode {
    /// Message template; `{}` is replaced by the joined message values
    pub fn template(&self) -> &'static str {
        match self {
            ErrorCode::SomeRecordsNotFound => "Record not found: {}",
            ErrorCode::InvalidUuidFormat => "Invalid UUID format: {}",
            ErrorCode::DuplicateSrsRecord => "Records with more than one stored MARC record: {}",
            ErrorCode::ErrorMappingRecord => "Error while mapping record {}",
            ErrorCode::TranslationFailed => "Translation failed: {}",
            ErrorCode::EmptyInput => "Empty or unreadable input: {}",
            ErrorCode::ChunkFailed => "Export of chunk failed: {}",
            ErrorCode::NothingToExport => "Nothing to export: no records were exported{}",
            ErrorCode::JobCancelled => "Job cancelled{}",
            ErrorCode::JobExpired => "Job expired: no updates for more than {} minutes",
        }
    }

    /// Codes kept as one running row per job
    pub fn is_merged(&self) -> bool {
        matches!(
            self,
            ErrorCode::SomeRecordsNotFound
                | ErrorCode::InvalidUuidFormat
                | ErrorCode::DuplicateSrsRecord
        )
    }
}

/// Severity of an error log row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Failure
    #[default]
    Error,
    /// Informational
    Info,
}

/// Identifying fields of the record an error is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedRecord {
    /// Record id
    pub id: String,
    /// Record hrid
    pub hrid: Option<String>,
    /// Record title
    pub title: Option<String>,
    /// Record type
    pub record_type: RecordType,
    /// Link to the record in the catalog UI
    pub inventory_link: Option<String>,
}

/// Error log row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLog {
    /// Row id
    pub id: Uuid,
    /// Owning job
    pub job_execution_id: JobExecutionId,
    /// Message code
    pub error_message_code: ErrorCode,
    /// Values rendered into the message template
    pub error_message_values: Vec<String>,
    /// Severity
    pub log_level: LogLevel,
    /// Record the error is about
    pub affected_record: Option<AffectedRecord>,
    /// Creation time
    pub created_date: DateTime<Utc>,
}

impl ErrorLog {
    /// Create an ERROR level row
    pub fn new(job_execution_id: JobExecutionId, code: ErrorCode, values: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_execution_id,
            error_message_code: code,
            error_message_values: values,
            log_level: LogLevel::Error,
            affected_record: None,
            created_date: Utc::now(),
        }
    }

    /// Attach the affected record
    pub fn with_affected_record(mut self, record: AffectedRecord) -> Self {
        self.affected_record = Some(record);
        self
    }

    /// Render the message
    pub fn message(&self) -> String {
        let joined = self.error_message_values.join(", ");
        let template = self.error_message_code.template();
        match self.error_message_code {
            ErrorCode::NothingToExport | ErrorCode::JobCancelled if joined.is_empty() => {
                template.replace("{}", "")
            }
            ErrorCode::NothingToExport | ErrorCode::JobCancelled => {
                template.replace("{}", &format!(": {joined}"))
            }
            _ => template.replace("{}", &joined),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_rendering() {
        let job = JobExecutionId::generate();
        let log = ErrorLog::new(
            job,
            ErrorCode::SomeRecordsNotFound,
            vec!["a".to_string(), "b".to_string()],
        );
        assert_eq!(log.message(), "Record not found: a, b");

        let cancelled = ErrorLog::new(job, ErrorCode::JobCancelled, Vec::new());
        assert_eq!(cancelled.message(), "Job cancelled");

        let expired = ErrorLog::new(job, ErrorCode::JobExpired, vec!["60".to_string()]);
        assert_eq!(
            expired.message(),
            "Job expired: no updates for more than 60 minutes"
        );
    }

    #[test]
    fn test_merged_codes() {
        assert!(ErrorCode::SomeRecordsNotFound.is_merged());
        assert!(ErrorCode::InvalidUuidFormat.is_merged());
        assert!(!ErrorCode::ErrorMappingRecord.is_merged());
        assert!(!ErrorCode::JobExpired.is_merged());
    }

    #[test]
    fn test_error_log_serializes_camel_case() {
        let log = ErrorLog::new(JobExecutionId::generate(), ErrorCode::ChunkFailed, vec![]);
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["errorMessageCode"], "chunkFailed");
        assert_eq!(json["logLevel"], "ERROR");
    }
}
