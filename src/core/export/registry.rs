//! Per-job registry
//!
//! Holds the live state of every running job: its identifier reader, the
//! record type it exports and its cancellation flag. Only the job's own task
//! touches the reader, so the mutex around it is never contended; other tasks
//! only flip the flag.

use crate::adapters::source::SourceReader;
use crate::domain::{JobExecutionId, RecordType};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Live state of one running job
pub struct JobEntry {
    /// Job id
    pub job_id: JobExecutionId,
    /// Record type of the job's identifiers
    pub record_type: RecordType,
    reader: Mutex<Box<dyn SourceReader>>,
    cancelled: AtomicBool,
    chunks: AtomicU64,
}

impl JobEntry {
    /// Create an entry owning `reader`
    pub fn new(
        job_id: JobExecutionId,
        record_type: RecordType,
        reader: Box<dyn SourceReader>,
    ) -> Self {
        Self {
            job_id,
            record_type,
            reader: Mutex::new(reader),
            cancelled: AtomicBool::new(false),
            chunks: AtomicU64::new(0),
        }
    }

    /// The job's identifier reader
    pub fn reader(&self) -> &Mutex<Box<dyn SourceReader>> {
        &self.reader
    }

    /// Request cancellation at the next chunk boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Count one dispatched chunk, returning its 1-based number
    pub fn next_chunk(&self) -> u64 {
        self.chunks.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Chunks dispatched so far
    pub fn chunks(&self) -> u64 {
        self.chunks.load(Ordering::SeqCst)
    }
}

/// Running jobs by id
#[derive(Default)]
pub struct JobRegistry {
    entries: DashMap<JobExecutionId, Arc<JobEntry>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job, replacing any previous entry with the same id
    pub fn insert(&self, entry: JobEntry) -> Arc<JobEntry> {
        let entry = Arc::new(entry);
        self.entries.insert(entry.job_id, Arc::clone(&entry));
        entry
    }

    /// Entry of a running job
    pub fn get(&self, job_id: &JobExecutionId) -> Option<Arc<JobEntry>> {
        self.entries.get(job_id).map(|e| Arc::clone(e.value()))
    }

    /// Drop a job's entry
    pub fn remove(&self, job_id: &JobExecutionId) -> Option<Arc<JobEntry>> {
        self.entries.remove(job_id).map(|(_, entry)| entry)
    }

    /// Mark one job for cancellation; false when it is not running here
    pub fn cancel(&self, job_id: &JobExecutionId) -> bool {
        match self.entries.get(job_id) {
            Some(entry) => {
                entry.cancel();
                true
            }
            None => false,
        }
    }

    /// Mark every running job for cancellation
    pub fn cancel_all(&self) -> usize {
        let mut count = 0;
        for entry in self.entries.iter() {
            entry.cancel();
            count += 1;
        }
        count
    }

    /// Ids of running jobs
    pub fn job_ids(&self) -> Vec<JobExecutionId> {
        self.entries.iter().map(|e| *e.key()).collect()
    }

    /// Number of running jobs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no job is running
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
