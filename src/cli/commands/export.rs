//! Export command implementation
//!
//! This module implements the `export` command: one job per identifier file,
//! run concurrently up to `export.max_concurrent_jobs`.

use super::load_valid_config;
use crate::core::export::{ExportRequest, ExportService};
use crate::domain::{JobExecution, JobStatus, MappingProfile, ProfileId, RecordType};
use clap::{Args, ValueEnum};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Record type selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordTypeArg {
    /// Bibliographic instances
    Instance,
    /// Holdings records
    Holdings,
    /// Authority records
    Authority,
}

impl From<RecordTypeArg> for RecordType {
    fn from(arg: RecordTypeArg) -> Self {
        match arg {
            RecordTypeArg::Instance => RecordType::Instance,
            RecordTypeArg::Holdings => RecordType::Holdings,
            RecordTypeArg::Authority => RecordType::Authority,
        }
    }
}

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Identifier files, one job per file
    #[arg(required = true, value_name = "IDS_FILE")]
    pub ids: Vec<String>,

    /// Mapping profile JSON file
    #[arg(long, conflicts_with = "profile_id")]
    pub profile: Option<String>,

    /// Id of a mapping profile held in the state store
    #[arg(long)]
    pub profile_id: Option<String>,

    /// Record type to export (defaults to the profile's record types)
    #[arg(long, value_enum)]
    pub record_type: Option<RecordTypeArg>,

    /// User recorded as the job's runner
    #[arg(long, env = "USER")]
    pub run_by: Option<String>,
}

/// Exit code for a set of closed jobs
pub fn exit_code_for(jobs: &[JobExecution], interrupted: bool) -> i32 {
    if interrupted {
        130
    } else if jobs.iter().all(|j| j.status == JobStatus::Completed) {
        0
    } else {
        1
    }
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(files = self.ids.len(), "Starting export command");

        let config = match load_valid_config(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let service = match ExportService::from_config(&config).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize export service");
                eprintln!("Failed to initialize export: {e}");
                return Ok(4);
            }
        };

        let profile = match self.resolve_profile(&service).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to resolve mapping profile");
                eprintln!("❌ {e}");
                return Ok(2);
            }
        };

        let sweep = service.expiry.clone().spawn_periodic(
            Duration::from_secs(60),
            shutdown_signal.clone(),
        );
        let watcher = {
            let orchestrator = Arc::clone(&service.orchestrator);
            let mut signal = shutdown_signal.clone();
            tokio::spawn(async move {
                while signal.changed().await.is_ok() {
                    if *signal.borrow() {
                        let cancelled = orchestrator.shutdown();
                        tracing::warn!(jobs = cancelled, "Shutdown requested, cancelling jobs");
                        println!("\n⚠️  Shutdown signal received, stopping after the current chunk...");
                        break;
                    }
                }
            })
        };

        println!("🚀 Starting export of {} file(s)...", self.ids.len());
        println!();

        let mut handles = Vec::with_capacity(self.ids.len());
        for file in &self.ids {
            let mut request = ExportRequest::new(file.clone(), profile.clone());
            if let Some(record_type) = self.record_type {
                request = request.with_record_type(record_type.into());
            }
            if let Some(user) = &self.run_by {
                request = request.with_run_by(user.clone());
            }
            match service.orchestrator.submit(request).await {
                Ok((job, handle)) => {
                    println!("  📄 {file} → job {} (#{})", job.id, job.hrid);
                    handles.push(handle);
                }
                Err(e) => {
                    tracing::error!(file = %file, error = %e, "Failed to submit export");
                    eprintln!("Export of {file} could not start: {e}");
                    watcher.abort();
                    sweep.abort();
                    return Ok(5);
                }
            }
        }

        let mut finished = Vec::with_capacity(handles.len());
        let mut fatal = false;
        for handle in handles {
            match handle.await {
                Ok(Ok(job)) => finished.push(job),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Export job failed");
                    eprintln!("Export failed: {e}");
                    fatal = true;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Export task aborted");
                    eprintln!("Export task aborted: {e}");
                    fatal = true;
                }
            }
        }
        watcher.abort();
        sweep.abort();

        println!();
        println!("📊 Export Summary:");
        for job in &finished {
            print_job(job);
        }
        println!();

        let interrupted = *shutdown_signal.borrow();
        if interrupted {
            println!("⚠️  Export interrupted. Cancelled jobs were closed as FAIL.");
        }
        if fatal {
            return Ok(5);
        }

        let exit_code = exit_code_for(&finished, interrupted);
        match exit_code {
            0 => println!("✅ Export completed successfully!"),
            1 => println!("⚠️  Export completed with errors, see `bibexport status`"),
            _ => {}
        }
        Ok(exit_code)
    }

    async fn resolve_profile(&self, service: &ExportService) -> anyhow::Result<MappingProfile> {
        if let Some(path) = &self.profile {
            let contents = tokio::fs::read_to_string(Path::new(path))
                .await
                .map_err(|e| anyhow::anyhow!("Failed to read profile {path}: {e}"))?;
            let profile: MappingProfile = serde_json::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("Invalid profile {path}: {e}"))?;
            return Ok(profile);
        }
        if let Some(id) = &self.profile_id {
            let id = ProfileId::new(id.clone()).map_err(|e| anyhow::anyhow!(e))?;
            return service
                .profiles
                .get_profile(&id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Mapping profile {id} not found"));
        }
        Ok(MappingProfile::default_instance())
    }
}

fn print_job(job: &JobExecution) {
    let duration = job
        .duration()
        .map(|d| format!("{:.2}s", d.num_milliseconds() as f64 / 1000.0))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  #{:<6} {:<22} total {:<8} exported {:<8} failed {:<8} duplicated {:<6} {}",
        job.hrid,
        job.status.to_string(),
        job.progress.total,
        job.progress.exported,
        job.progress.failed,
        job.progress.duplicated,
        duration
    );
    for file in &job.exported_files {
        println!("          → {}", file.file_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobExecutionId;

    fn closed(status: JobStatus) -> JobExecution {
        let mut job = JobExecution::builder(JobExecutionId::generate()).build();
        job.mark_started(1);
        job.finish(status);
        job
    }

    #[test]
    fn test_export_args_defaults() {
        let args = ExportArgs {
            ids: vec!["ids.csv".to_string()],
            profile: None,
            profile_id: None,
            record_type: None,
            run_by: None,
        };

        assert_eq!(args.ids.len(), 1);
        assert!(args.profile.is_none());
        assert!(args.record_type.is_none());
    }

    #[test]
    fn test_record_type_arg_conversion() {
        assert_eq!(RecordType::from(RecordTypeArg::Holdings), RecordType::Holdings);
        assert_eq!(
            RecordType::from(RecordTypeArg::Authority),
            RecordType::Authority
        );
    }

    #[test]
    fn test_exit_codes() {
        let ok = closed(JobStatus::Completed);
        let partial = closed(JobStatus::CompletedWithErrors);
        let failed = closed(JobStatus::Fail);

        assert_eq!(exit_code_for(&[ok.clone()], false), 0);
        assert_eq!(exit_code_for(&[ok.clone(), partial], false), 1);
        assert_eq!(exit_code_for(&[failed], false), 1);
        assert_eq!(exit_code_for(&[ok], true), 130);
    }
}
