//! Status command implementation
//!
//! This module implements the `status` command for listing jobs and the
//! error log of a single job.

use super::load_valid_config;
use crate::adapters::factory::create_state_store;
use crate::adapters::repository::Page;
use crate::core::state::{ErrorLogService, JobExecutionManager};
use crate::domain::{JobExecutionId, JobStatus, LogLevel};
use clap::{Args, ValueEnum};
use std::str::FromStr;
use std::sync::Arc;

/// Job status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    /// Created, not started
    New,
    /// Running
    InProgress,
    /// Every record exported
    Completed,
    /// Partly exported
    CompletedWithErrors,
    /// Failed, cancelled or expired
    Fail,
}

impl From<StatusFilter> for JobStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::New => JobStatus::New,
            StatusFilter::InProgress => JobStatus::InProgress,
            StatusFilter::Completed => JobStatus::Completed,
            StatusFilter::CompletedWithErrors => JobStatus::CompletedWithErrors,
            StatusFilter::Fail => JobStatus::Fail,
        }
    }
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only list jobs with this status
    #[arg(long, value_enum)]
    pub status: Option<StatusFilter>,

    /// Show the error log of this job
    #[arg(long)]
    pub job: Option<String>,

    /// Maximum rows to show
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        let config = match load_valid_config(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let (jobs, error_logs) = match open_state(&config).await {
            Ok(state) => state,
            Err(e) => {
                println!("❌ Failed to open the state store");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        match &self.job {
            Some(id) => self.show_job(&jobs, &error_logs, id).await,
            None => self.list_jobs(&jobs).await,
        }
    }

    async fn list_jobs(&self, jobs: &JobExecutionManager) -> anyhow::Result<i32> {
        println!("📊 Export Status");
        println!();

        let listed = match jobs
            .list(self.status.map(Into::into), Page::new(0, self.limit))
            .await
        {
            Ok(listed) => listed,
            Err(e) => {
                println!("❌ Failed to load jobs");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        if listed.is_empty() {
            println!("No export jobs found.");
            println!("Run 'bibexport export <IDS_FILE>' to start exporting records.");
            return Ok(0);
        }

        println!("Found {} job(s):", listed.len());
        println!();
        println!(
            "{:<8} {:<38} {:<22} {:<8} {:<9} {:<8} {:<20}",
            "HRID", "Job ID", "Status", "Total", "Exported", "Failed", "Last Update"
        );
        println!("{}", "-".repeat(118));

        for job in listed {
            println!(
                "{:<8} {:<38} {:<22} {:<8} {:<9} {:<8} {:<20}",
                job.hrid,
                job.id.to_string(),
                job.status.to_string(),
                job.progress.total,
                job.progress.exported,
                job.progress.failed,
                job.last_updated_date.format("%Y-%m-%d %H:%M:%S")
            );
        }

        println!();
        Ok(0)
    }

    async fn show_job(
        &self,
        jobs: &JobExecutionManager,
        error_logs: &ErrorLogService,
        id: &str,
    ) -> anyhow::Result<i32> {
        let id = match JobExecutionId::from_str(id) {
            Ok(id) => id,
            Err(e) => {
                println!("❌ Invalid job id: {e}");
                return Ok(2);
            }
        };
        let Some(job) = jobs.find(&id).await? else {
            println!("❌ Job {id} not found");
            return Ok(1);
        };

        println!("📄 Job #{} ({})", job.hrid, job.id);
        println!("  Status: {}", job.status);
        if let Some(profile) = &job.job_profile_name {
            println!("  Profile: {profile}");
        }
        if let Some(user) = &job.run_by {
            println!("  Run by: {user}");
        }
        println!(
            "  Progress: {} total, {} exported, {} failed, {} duplicated",
            job.progress.total, job.progress.exported, job.progress.failed, job.progress.duplicated
        );
        for file in &job.exported_files {
            println!("  File: {}", file.file_name);
        }
        println!();

        let logs = error_logs.logs_for(&id, Page::new(0, self.limit)).await?;
        if logs.is_empty() {
            println!("No error log entries.");
            return Ok(0);
        }

        println!("Error log ({} entries):", logs.len());
        for log in logs {
            let level = match log.log_level {
                LogLevel::Error => "ERROR",
                LogLevel::Info => "INFO ",
            };
            println!(
                "  {} {} {}",
                log.created_date.format("%Y-%m-%d %H:%M:%S"),
                level,
                log.message()
            );
            if let Some(link) = log.affected_record.as_ref().and_then(|r| r.inventory_link.as_ref()) {
                println!("      {link}");
            }
        }
        println!();
        Ok(0)
    }
}

/// Open the job and error log services on the configured store
pub(crate) async fn open_state(
    config: &crate::config::BibExportConfig,
) -> crate::domain::Result<(Arc<JobExecutionManager>, Arc<ErrorLogService>)> {
    let store = create_state_store(config).await?;
    Ok((
        Arc::new(JobExecutionManager::new(store.clone())),
        Arc::new(ErrorLogService::new(store)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_defaults() {
        let args = StatusArgs {
            status: None,
            job: None,
            limit: 50,
        };

        assert!(args.status.is_none());
        assert!(args.job.is_none());
    }

    #[test]
    fn test_status_filter_conversion() {
        assert_eq!(JobStatus::from(StatusFilter::Fail), JobStatus::Fail);
        assert_eq!(
            JobStatus::from(StatusFilter::CompletedWithErrors),
            JobStatus::CompletedWithErrors
        );
    }
}
