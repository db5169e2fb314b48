//! JSON snapshot store
//!
//! Holds jobs, error logs and profiles in memory behind one lock and, when
//! opened with a path, rewrites a JSON snapshot after every mutation. The
//! snapshot is written to a sibling temp file and renamed into place.

use super::traits::{ErrorLogRepository, JobExecutionRepository, Page, ProfileRepository};
use crate::domain::ids::{JobExecutionId, ProfileId};
use crate::domain::{
    BibExportError, ErrorCode, ErrorLog, JobExecution, JobStatus, MappingProfile, Result,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    last_hrid: u64,
    #[serde(default)]
    jobs: IndexMap<JobExecutionId, JobExecution>,
    #[serde(default)]
    error_logs: IndexMap<Uuid, ErrorLog>,
    #[serde(default)]
    profiles: IndexMap<String, MappingProfile>,
}

/// Repository implementation backed by an optional JSON snapshot file
pub struct FileStateStore {
    path: Option<PathBuf>,
    state: RwLock<Snapshot>,
}

impl FileStateStore {
    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(Snapshot::default()),
        }
    }

    /// Open a store persisted at `path`, loading it when the file exists
    ///
    /// # Errors
    ///
    /// Returns [`BibExportError::Repository`] when the existing file cannot be
    /// read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Snapshot::default(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                BibExportError::Repository(format!(
                    "Failed to parse state file {}: {e}",
                    path.display()
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => {
                return Err(BibExportError::Repository(format!(
                    "Failed to read state file {}: {e}",
                    path.display()
                )))
            }
        };

        tracing::debug!(
            path = %path.display(),
            jobs = snapshot.jobs.len(),
            error_logs = snapshot.error_logs.len(),
            profiles = snapshot.profiles.len(),
            "Loaded state store"
        );

        Ok(Self {
            path: Some(path),
            state: RwLock::new(snapshot),
        })
    }

    /// Snapshot file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                BibExportError::Repository(format!(
                    "Failed to create state directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(|e| {
            BibExportError::Repository(format!("Failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, path).await.map_err(|e| {
            BibExportError::Repository(format!("Failed to replace {}: {e}", path.display()))
        })?;
        Ok(())
    }
}

fn paginate<T: Clone>(items: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    items.skip(page.offset).take(page.limit).collect()
}

#[async_trait]
impl JobExecutionRepository for FileStateStore {
    async fn get_job(&self, id: &JobExecutionId) -> Result<Option<JobExecution>> {
        Ok(self.state.read().await.jobs.get(id).cloned())
    }

    async fn save_job(&self, job: &JobExecution) -> Result<()> {
        let mut state = self.state.write().await;
        state.last_hrid = state.last_hrid.max(job.hrid);
        state.jobs.insert(job.id, job.clone());
        self.persist(&state).await
    }

    async fn update_job(&self, job: &JobExecution) -> Result<()> {
        let mut state = self.state.write().await;
        match state.jobs.get_mut(&job.id) {
            Some(existing) => *existing = job.clone(),
            None => {
                return Err(BibExportError::Repository(format!(
                    "Job execution {} does not exist",
                    job.id
                )))
            }
        }
        self.persist(&state).await
    }

    async fn delete_job(&self, id: &JobExecutionId) -> Result<bool> {
        let mut state = self.state.write().await;
        let removed = state.jobs.shift_remove(id).is_some();
        if removed {
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    async fn query_jobs(&self, status: Option<JobStatus>, page: Page) -> Result<Vec<JobExecution>> {
        let state = self.state.read().await;
        let mut jobs: Vec<&JobExecution> = state
            .jobs
            .values()
            .filter(|job| status.map_or(true, |s| job.status == s))
            .collect();
        jobs.sort_by(|a, b| b.hrid.cmp(&a.hrid));
        Ok(paginate(jobs.into_iter().cloned(), page))
    }

    async fn next_hrid(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        state.last_hrid += 1;
        let hrid = state.last_hrid;
        self.persist(&state).await?;
        Ok(hrid)
    }
}

#[async_trait]
impl ErrorLogRepository for FileStateStore {
    async fn get_log(&self, id: &Uuid) -> Result<Option<ErrorLog>> {
        Ok(self.state.read().await.error_logs.get(id).cloned())
    }

    async fn save_log(&self, log: &ErrorLog) -> Result<()> {
        let mut state = self.state.write().await;
        state.error_logs.insert(log.id, log.clone());
        self.persist(&state).await
    }

    async fn update_log(&self, log: &ErrorLog) -> Result<()> {
        let mut state = self.state.write().await;
        match state.error_logs.get_mut(&log.id) {
            Some(existing) => *existing = log.clone(),
            None => {
                return Err(BibExportError::Repository(format!(
                    "Error log {} does not exist",
                    log.id
                )))
            }
        }
        self.persist(&state).await
    }

    async fn delete_log(&self, id: &Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let removed = state.error_logs.shift_remove(id).is_some();
        if removed {
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    async fn query_logs(&self, job_id: &JobExecutionId, page: Page) -> Result<Vec<ErrorLog>> {
        let state = self.state.read().await;
        let logs = state
            .error_logs
            .values()
            .filter(|log| log.job_execution_id == *job_id)
            .cloned();
        Ok(paginate(logs, page))
    }

    async fn find_log(&self, job_id: &JobExecutionId, code: ErrorCode) -> Result<Option<ErrorLog>> {
        let state = self.state.read().await;
        Ok(state
            .error_logs
            .values()
            .find(|log| log.job_execution_id == *job_id && log.error_message_code == code)
            .cloned())
    }

    async fn delete_logs_for_job(&self, job_id: &JobExecutionId) -> Result<usize> {
        let mut state = self.state.write().await;
        let before = state.error_logs.len();
        state
            .error_logs
            .retain(|_, log| log.job_execution_id != *job_id);
        let removed = before - state.error_logs.len();
        if removed > 0 {
            self.persist(&state).await?;
        }
        Ok(removed)
    }
}

#[async_trait]
impl ProfileRepository for FileStateStore {
    async fn get_profile(&self, id: &ProfileId) -> Result<Option<MappingProfile>> {
        Ok(self.state.read().await.profiles.get(id.as_str()).cloned())
    }

    async fn save_profile(&self, profile: &MappingProfile) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .profiles
            .insert(profile.id.as_str().to_string(), profile.clone());
        self.persist(&state).await
    }

    async fn delete_profile(&self, id: &ProfileId) -> Result<bool> {
        let mut state = self.state.write().await;
        let removed = state.profiles.shift_remove(id.as_str()).is_some();
        if removed {
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    async fn query_profiles(&self, page: Page) -> Result<Vec<MappingProfile>> {
        let state = self.state.read().await;
        let mut profiles: Vec<&MappingProfile> = state.profiles.values().collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(profiles.into_iter().cloned(), page))
    }
}
