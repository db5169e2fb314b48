//! Chunk dispatch message
//!
//! [`ExportPayload`] is the only value passed from the orchestrator to an
//! export strategy. It owns plain data only, so it can be serialized and sent
//! across any task or process boundary.

use super::ids::JobExecutionId;
use super::profile::MappingProfile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Output file definition derived at job start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDefinition {
    /// Definition id
    pub id: Uuid,
    /// Input file name without extension
    pub file_name: String,
    /// Output path relative to the storage root
    pub output_path: String,
}

impl FileDefinition {
    /// Derive the output definition for a job
    ///
    /// The path is `<job_execution_id>/<file_name>-<job_hrid>.<extension>`.
    pub fn derive(
        job_execution_id: JobExecutionId,
        job_hrid: u64,
        source_name: &str,
        extension: &str,
    ) -> Self {
        let stem = std::path::Path::new(source_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("export");
        Self {
            id: Uuid::new_v4(),
            file_name: stem.to_string(),
            output_path: format!("{job_execution_id}/{stem}-{job_hrid}.{extension}"),
        }
    }
}

/// Chunk message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    /// Identifiers of this chunk; cleared once the chunk completes
    pub identifiers: Vec<String>,
    /// Marks the final chunk
    pub last: bool,
    /// Owning job
    pub job_execution_id: JobExecutionId,
    /// Output file
    pub file_export_definition: FileDefinition,
    /// Mapping profile of the job
    pub mapping_profile: MappingProfile,
    /// Records exported so far
    pub exported_records_number: u64,
    /// Records failed so far
    pub failed_records_number: u64,
    /// Duplicated identifiers so far
    pub duplicated_records: u64,
    /// Invalid identifiers so far
    pub invalid_identifiers: u64,
}

impl ExportPayload {
    /// Create the first payload of a job
    pub fn new(
        job_execution_id: JobExecutionId,
        file_export_definition: FileDefinition,
        mapping_profile: MappingProfile,
    ) -> Self {
        Self {
            identifiers: Vec::new(),
            last: false,
            job_execution_id,
            file_export_definition,
            mapping_profile,
            exported_records_number: 0,
            failed_records_number: 0,
            duplicated_records: 0,
            invalid_identifiers: 0,
        }
    }

    /// Load the next chunk of identifiers
    pub fn load_chunk(&mut self, identifiers: Vec<String>, last: bool) {
        self.identifiers = identifiers;
        self.last = last;
    }

    /// Drop the identifiers of a completed chunk
    pub fn clear_identifiers(&mut self) {
        self.identifiers = Vec::new();
    }
}
