//! Export orchestrator - drives export jobs chunk by chunk
//!
//! One tokio task runs one job. A semaphore bounds how many jobs run at once.
//! Inside a job exactly one chunk is in flight: the next chunk is read only
//! after the strategy returned for the previous one. Cancellation is observed
//! at chunk boundaries.
//!
//! ```text
//! NEW -> IN_PROGRESS -> COMPLETED | COMPLETED_WITH_ERRORS | FAIL
//! ```

use super::registry::{JobEntry, JobRegistry};
use super::statistics::Statistics;
use super::strategy::{export_record_type, ExportStrategy, StrategyTable};
use crate::adapters::source::SourceReaderFactory;
use crate::adapters::storage::Storage;
use crate::core::mapping::MappingService;
use crate::core::state::{ErrorLogService, JobExecutionManager};
use crate::domain::{
    final_status, BibExportError, ErrorCode, ExportPayload, ExportedFile, FileDefinition,
    JobExecution, JobExecutionId, JobStatus, MappingProfile, Progress, RecordType, Result,
};
use crate::{log_chunk_processed, log_job_finalized};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Request to export one identifier file
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Identifier file reference, resolved by the source reader factory
    pub file_ref: String,
    /// Mapping profile of the job
    pub profile: MappingProfile,
    /// Record type of the identifiers; derived from the profile when absent
    pub record_type: Option<RecordType>,
    /// User starting the job
    pub run_by: Option<String>,
}

impl ExportRequest {
    /// Request exporting `file_ref` with `profile`
    pub fn new(file_ref: impl Into<String>, profile: MappingProfile) -> Self {
        Self {
            file_ref: file_ref.into(),
            profile,
            record_type: None,
            run_by: None,
        }
    }

    /// Set the record type of the identifiers
    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = Some(record_type);
        self
    }

    /// Set the user starting the job
    pub fn with_run_by(mut self, user: impl Into<String>) -> Self {
        self.run_by = Some(user.into());
        self
    }

    fn resolved_record_type(&self) -> RecordType {
        self.record_type
            .unwrap_or_else(|| export_record_type(&self.profile))
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    /// Identifiers per chunk
    pub batch_size: usize,
    /// Jobs running at once
    pub max_concurrent_jobs: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_jobs: 4,
        }
    }
}

/// How a job's chunk loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEnd {
    /// The last chunk was processed
    Finished,
    /// The last chunk, or the reader, failed
    LastChunkFailed,
    /// Cancellation was observed between chunks
    Cancelled,
}

/// Terminal status of a job that processed its last chunk
///
/// # Errors
///
/// Returns an error if the output existence check fails.
pub async fn resolve_final_status(
    storage: &dyn Storage,
    output_path: &str,
    progress: &Progress,
) -> Result<JobStatus> {
    let output_exists = storage.exists(output_path).await?;
    Ok(final_status(
        progress.exported,
        progress.failed,
        output_exists,
    ))
}

/// Export orchestrator
pub struct ExportOrchestrator {
    jobs: Arc<JobExecutionManager>,
    error_logs: Arc<ErrorLogService>,
    storage: Arc<dyn Storage>,
    readers: Arc<dyn SourceReaderFactory>,
    strategies: StrategyTable,
    mapping: Arc<MappingService>,
    registry: Arc<JobRegistry>,
    permits: Arc<Semaphore>,
    batch_size: usize,
    shutting_down: AtomicBool,
}

impl ExportOrchestrator {
    /// Create a new ExportOrchestrator
    ///
    /// # Arguments
    ///
    /// * `jobs` - Job state
    /// * `error_logs` - Job error trail
    /// * `storage` - Output files
    /// * `readers` - Identifier file readers
    /// * `strategies` - Export strategy per record type
    /// * `mapping` - Mapping service, for releasing rule sets at finalization
    /// * `settings` - Chunk size and concurrency
    pub fn new(
        jobs: Arc<JobExecutionManager>,
        error_logs: Arc<ErrorLogService>,
        storage: Arc<dyn Storage>,
        readers: Arc<dyn SourceReaderFactory>,
        strategies: StrategyTable,
        mapping: Arc<MappingService>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            jobs,
            error_logs,
            storage,
            readers,
            strategies,
            mapping,
            registry: Arc::new(JobRegistry::new()),
            permits: Arc::new(Semaphore::new(settings.max_concurrent_jobs.max(1))),
            batch_size: settings.batch_size,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Registry of running jobs
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Job state manager
    pub fn jobs(&self) -> &Arc<JobExecutionManager> {
        &self.jobs
    }

    /// Create a job and run it on its own task
    ///
    /// Returns the NEW job and the handle resolving to the closed job.
    ///
    /// # Errors
    ///
    /// Returns an error if no strategy exports the requested record type or
    /// the job cannot be created.
    pub async fn submit(
        self: &Arc<Self>,
        request: ExportRequest,
    ) -> Result<(JobExecution, JoinHandle<Result<JobExecution>>)> {
        let strategy = self.strategies.get(request.resolved_record_type())?;
        let job = self
            .jobs
            .create(&request.profile, request.run_by.as_deref())
            .await?;
        let this = Arc::clone(self);
        let created = job.clone();
        let handle = tokio::spawn(async move { this.run(job, request, strategy).await });
        Ok((created, handle))
    }

    /// Create a job and run it to completion on the current task
    ///
    /// # Errors
    ///
    /// Returns an error if no strategy exports the requested record type, or
    /// job state cannot be persisted.
    pub async fn export(&self, request: ExportRequest) -> Result<JobExecution> {
        let strategy = self.strategies.get(request.resolved_record_type())?;
        let job = self
            .jobs
            .create(&request.profile, request.run_by.as_deref())
            .await?;
        self.run(job, request, strategy).await
    }

    /// Request cancellation of a running job
    pub fn cancel(&self, job_id: &JobExecutionId) -> bool {
        let found = self.registry.cancel(job_id);
        if found {
            tracing::info!(job_execution_id = %job_id, "Job cancellation requested");
        }
        found
    }

    /// Request cancellation of every running job
    pub fn cancel_all(&self) -> usize {
        let count = self.registry.cancel_all();
        if count > 0 {
            tracing::info!(jobs = count, "Cancellation requested for running jobs");
        }
        count
    }

    /// Cancel every running job and every job still waiting for a permit
    pub fn shutdown(&self) -> usize {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.cancel_all()
    }

    async fn run(
        &self,
        job: JobExecution,
        request: ExportRequest,
        strategy: Arc<dyn ExportStrategy>,
    ) -> Result<JobExecution> {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| BibExportError::Other(format!("Job pool closed: {e}")))?;

        let mut reader = match self.readers.open(&request.file_ref, self.batch_size).await {
            Ok(reader) => reader,
            Err(e) => return self.fail_on_input(&job, &request.file_ref, Some(e)).await,
        };
        let total = reader.total_count();
        let has_data = match reader.has_next().await {
            Ok(has_data) => has_data,
            Err(e) => {
                if let Err(e) = reader.close().await {
                    tracing::warn!(job_execution_id = %job.id, error = %e, "Failed to close source reader");
                }
                return self.fail_on_input(&job, &request.file_ref, Some(e)).await;
            }
        };
        if total == 0 || !has_data {
            if let Err(e) = reader.close().await {
                tracing::warn!(job_execution_id = %job.id, error = %e, "Failed to close source reader");
            }
            return self.fail_on_input(&job, &request.file_ref, None).await;
        }

        let definition = FileDefinition::derive(
            job.id,
            job.hrid,
            &request.file_ref,
            request.profile.output_format.extension(),
        );
        self.jobs
            .add_exported_file(
                &job.id,
                ExportedFile {
                    file_id: definition.id,
                    file_name: definition.output_path.clone(),
                },
            )
            .await?;
        self.jobs.start(&job.id, total).await?;
        tracing::info!(
            job_execution_id = %job.id,
            hrid = job.hrid,
            record_type = %strategy.record_type(),
            total,
            output = %definition.output_path,
            "Job started"
        );

        let entry = self
            .registry
            .insert(JobEntry::new(job.id, strategy.record_type(), reader));
        if self.shutting_down.load(Ordering::SeqCst) {
            entry.cancel();
        }
        let mut payload = ExportPayload::new(job.id, definition, request.profile);
        let end = self.chunk_loop(&entry, strategy.as_ref(), &mut payload).await;
        self.finalize(&entry, &payload, end).await
    }

    async fn chunk_loop(
        &self,
        entry: &JobEntry,
        strategy: &dyn ExportStrategy,
        payload: &mut ExportPayload,
    ) -> Result<LoopEnd> {
        let job_id = entry.job_id;
        loop {
            if entry.is_cancelled() {
                return Ok(LoopEnd::Cancelled);
            }

            let read = {
                let mut reader = entry.reader().lock().await;
                match reader.read_next().await {
                    Ok(identifiers) => {
                        let last = match reader.has_next().await {
                            Ok(more) => !more,
                            Err(e) => {
                                tracing::warn!(
                                    job_execution_id = %job_id,
                                    error = %e,
                                    "Source reader failed, treating chunk as last"
                                );
                                true
                            }
                        };
                        Ok((identifiers, last))
                    }
                    Err(e) => Err(e),
                }
            };
            let chunk = entry.next_chunk();
            let (identifiers, last) = match read {
                Ok(read) => read,
                Err(e) => {
                    tracing::error!(job_execution_id = %job_id, chunk, error = %e, "Failed to read chunk");
                    let row = (
                        ErrorCode::ChunkFailed,
                        vec![format!("chunk {chunk}"), e.to_string()],
                    );
                    if !self.record_chunk(&job_id, vec![row], &Statistics::new()).await? {
                        return Ok(LoopEnd::Cancelled);
                    }
                    return Ok(LoopEnd::LastChunkFailed);
                }
            };

            let size = identifiers.len();
            payload.load_chunk(identifiers, last);
            match strategy.export(payload).await {
                Ok(stats) => {
                    if !self.apply_statistics(payload, &stats).await? {
                        payload.clear_identifiers();
                        return Ok(LoopEnd::Cancelled);
                    }
                    log_chunk_processed!(&job_id, size, stats.exported, stats.failed_total(), last);
                }
                Err(e) => {
                    tracing::error!(
                        job_execution_id = %job_id,
                        chunk,
                        size,
                        last,
                        error = %e,
                        "Chunk export failed"
                    );
                    let row = (
                        ErrorCode::ChunkFailed,
                        vec![format!("chunk {chunk}"), e.to_string()],
                    );
                    let failed = Statistics {
                        failed: size as u64,
                        ..Statistics::new()
                    };
                    if !self.record_chunk(&job_id, vec![row], &failed).await? {
                        payload.clear_identifiers();
                        return Ok(LoopEnd::Cancelled);
                    }
                    payload.failed_records_number += size as u64;
                    if last {
                        payload.clear_identifiers();
                        return Ok(LoopEnd::LastChunkFailed);
                    }
                }
            }
            payload.clear_identifiers();

            if last {
                return Ok(LoopEnd::Finished);
            }
        }
    }

    /// Returns false when the job was closed while the chunk was in flight
    async fn apply_statistics(
        &self,
        payload: &mut ExportPayload,
        stats: &Statistics,
    ) -> Result<bool> {
        let rows = [
            (ErrorCode::SomeRecordsNotFound, &stats.not_found_ids),
            (ErrorCode::InvalidUuidFormat, &stats.invalid_ids),
            (ErrorCode::DuplicateSrsRecord, &stats.duplicated_ids),
        ]
        .into_iter()
        .filter(|(_, ids)| !ids.is_empty())
        .map(|(code, ids)| (code, ids.clone()))
        .collect();

        if !self
            .record_chunk(&payload.job_execution_id, rows, stats)
            .await?
        {
            return Ok(false);
        }
        payload.exported_records_number += stats.exported;
        payload.failed_records_number += stats.failed + stats.not_found_ids.len() as u64;
        payload.invalid_identifiers += stats.invalid_ids.len() as u64;
        payload.duplicated_records += stats.duplicated;
        Ok(true)
    }

    /// Add a chunk's error rows and counters to a job that is still running
    ///
    /// Both happen under the job manager's lock, so a job closed by the expiry
    /// sweep keeps its zeroed counters and collapsed error log. Returns false
    /// when the job is already closed; nothing is recorded then.
    async fn record_chunk(
        &self,
        job_id: &JobExecutionId,
        rows: Vec<(ErrorCode, Vec<String>)>,
        stats: &Statistics,
    ) -> Result<bool> {
        let mut update = self.jobs.lock(job_id).await?;
        if update.job().status.is_terminal() {
            tracing::warn!(
                job_execution_id = %job_id,
                status = %update.job().status,
                exported = stats.exported,
                failed = stats.failed_total(),
                "Job closed while a chunk was in flight, chunk results dropped"
            );
            return Ok(false);
        }
        for (code, values) in rows {
            self.error_logs.record(job_id, code, values).await?;
        }
        update
            .job_mut()
            .add_progress(stats.exported, stats.failed_total(), stats.duplicated);
        update.save().await?;
        Ok(true)
    }

    async fn finalize(
        &self,
        entry: &JobEntry,
        payload: &ExportPayload,
        end: Result<LoopEnd>,
    ) -> Result<JobExecution> {
        let job_id = entry.job_id;
        if let Err(e) = entry.reader().lock().await.close().await {
            tracing::warn!(job_execution_id = %job_id, error = %e, "Failed to close source reader");
        }
        self.registry.remove(&job_id);
        self.mapping.release(&job_id);

        let current = self.jobs.get(&job_id).await?;
        if current.status.is_terminal() {
            tracing::warn!(
                job_execution_id = %job_id,
                status = %current.status,
                "Job was closed while running"
            );
            return Ok(current);
        }

        let status = match end {
            Ok(LoopEnd::Finished) => {
                let output_path = &payload.file_export_definition.output_path;
                let status = match resolve_final_status(
                    self.storage.as_ref(),
                    output_path,
                    &current.progress,
                )
                .await
                {
                    Ok(status) => status,
                    Err(e) => {
                        tracing::warn!(job_execution_id = %job_id, error = %e, "Failed to check output");
                        final_status(current.progress.exported, current.progress.failed, false)
                    }
                };
                if status == JobStatus::Fail {
                    self.error_logs
                        .record(&job_id, ErrorCode::NothingToExport, Vec::new())
                        .await?;
                }
                status
            }
            Ok(LoopEnd::LastChunkFailed) => JobStatus::Fail,
            Ok(LoopEnd::Cancelled) => {
                self.error_logs
                    .record(&job_id, ErrorCode::JobCancelled, Vec::new())
                    .await?;
                JobStatus::Fail
            }
            Err(e) => {
                tracing::error!(job_execution_id = %job_id, error = %e, "Job aborted");
                if let Err(log_err) = self
                    .error_logs
                    .record(&job_id, ErrorCode::ChunkFailed, vec![e.to_string()])
                    .await
                {
                    tracing::warn!(job_execution_id = %job_id, error = %log_err, "Failed to record job failure");
                }
                JobStatus::Fail
            }
        };

        let job = self.jobs.finish(&job_id, status).await?;
        log_job_finalized!(job);
        Ok(job)
    }

    async fn fail_on_input(
        &self,
        job: &JobExecution,
        file_ref: &str,
        error: Option<BibExportError>,
    ) -> Result<JobExecution> {
        let mut values = vec![file_ref.to_string()];
        if let Some(e) = &error {
            values.push(e.to_string());
        }
        tracing::error!(
            job_execution_id = %job.id,
            file = %file_ref,
            error = ?error.as_ref().map(ToString::to_string),
            "Empty or unreadable input"
        );
        self.error_logs
            .record(&job.id, ErrorCode::EmptyInput, values)
            .await?;
        let job = self.jobs.finish(&job.id, JobStatus::Fail).await?;
        log_job_finalized!(job);
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::catalog::JsonCatalog;
    use crate::adapters::repository::{FileStateStore, Page};
    use crate::adapters::source::FileSourceReaderFactory;
    use crate::adapters::storage::LocalStorage;
    use crate::core::export::ExpirySweep;
    use crate::core::mapping::build_mapping_pool;
    use crate::core::reference_data::ReferenceDataCache;
    use crate::core::rules::{DefaultRules, RuleFactory};
    use crate::core::translation::TranslationRegistry;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;
    use test_case::test_case;

    /// Expires the job mid-chunk, then reports the chunk as if nothing happened
    struct ExpiringStrategy {
        sweep: Arc<ExpirySweep>,
    }

    #[async_trait]
    impl ExportStrategy for ExpiringStrategy {
        fn record_type(&self) -> RecordType {
            RecordType::Instance
        }

        async fn export(&self, payload: &ExportPayload) -> Result<Statistics> {
            self.sweep.run_at(Utc::now() + Duration::hours(2)).await?;
            Ok(Statistics {
                exported: 3,
                failed: 2,
                not_found_ids: payload.identifiers[..2].to_vec(),
                ..Statistics::new()
            })
        }
    }

    #[tokio::test]
    async fn test_chunk_finishing_after_expiry_is_dropped() {
        let dir = TempDir::new().unwrap();
        let ids: String = (1..=5).map(|i| format!("id-{i}\n")).collect();
        std::fs::write(dir.path().join("ids.txt"), ids).unwrap();

        let store = Arc::new(FileStateStore::in_memory());
        let jobs = Arc::new(JobExecutionManager::new(store.clone()));
        let logs = Arc::new(ErrorLogService::new(store));
        let mapping = Arc::new(MappingService::new(
            build_mapping_pool(1).unwrap(),
            RuleFactory::new(Arc::new(DefaultRules::load().unwrap())),
            Arc::new(TranslationRegistry::new()),
            Arc::new(ReferenceDataCache::new(
                Arc::new(JsonCatalog::new()),
                std::time::Duration::from_secs(60),
            )),
            logs.clone(),
        ));
        let sweep = Arc::new(ExpirySweep::new(jobs.clone(), logs.clone(), 60));
        let orchestrator = ExportOrchestrator::new(
            jobs.clone(),
            logs.clone(),
            Arc::new(LocalStorage::new(dir.path().join("out"))),
            Arc::new(FileSourceReaderFactory::new(Some(dir.path().to_path_buf()))),
            StrategyTable::empty().with_strategy(Arc::new(ExpiringStrategy { sweep })),
            mapping,
            OrchestratorSettings {
                batch_size: 10,
                max_concurrent_jobs: 1,
            },
        );

        let job = orchestrator
            .export(ExportRequest::new("ids.txt", MappingProfile::default_instance()))
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Fail);
        let stored = jobs.get(&job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Fail);
        assert_eq!(stored.progress.exported, 0);
        assert_eq!(stored.progress.failed, 0);
        assert_eq!(stored.progress.total, 5);

        let rows = logs.logs_for(&job.id, Page::all()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].error_message_code, ErrorCode::JobExpired);
        assert!(orchestrator.registry().get(&job.id).is_none());
    }

    fn progress(exported: u64, failed: u64) -> Progress {
        Progress {
            total: exported + failed,
            exported,
            failed,
            duplicated: 0,
        }
    }

    #[test_case(0, 0, false, JobStatus::Fail ; "nothing exported and no output")]
    #[test_case(0, 5, true, JobStatus::CompletedWithErrors ; "nothing exported but output present")]
    #[test_case(10, 0, true, JobStatus::Completed ; "everything exported")]
    #[test_case(8, 2, true, JobStatus::CompletedWithErrors ; "some records failed")]
    #[tokio::test]
    async fn test_resolve_final_status(
        exported: u64,
        failed: u64,
        output_present: bool,
        expected: JobStatus,
    ) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let path = "job/ids-1.mrc";
        if output_present {
            storage.write(path, b"record").await.unwrap();
        }
        let status = resolve_final_status(&storage, path, &progress(exported, failed))
            .await
            .unwrap();
        assert_eq!(status, expected);
    }

    #[test]
    fn test_request_record_type_defaults_from_profile() {
        let mut profile = MappingProfile::default_instance();
        profile.record_types = vec![RecordType::Holdings];
        let request = ExportRequest::new("ids.txt", profile);
        assert_eq!(request.resolved_record_type(), RecordType::Holdings);
        let request = request.with_record_type(RecordType::Instance);
        assert_eq!(request.resolved_record_type(), RecordType::Instance);
    }
}
