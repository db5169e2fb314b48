//! Per-job reference data cache
//!
//! The first [`ReferenceDataCache::get`] for a job loads every entity type in
//! one go; concurrent callers for the same job wait on the same load. A slot
//! that has not been read for longer than the TTL is dropped and reloaded on
//! its next use.

use super::{ReferenceData, ENTITY_TYPES};
use crate::adapters::catalog::CatalogClient;
use crate::domain::{JobExecutionId, Result};
use dashmap::DashMap;
use futures::future::try_join_all;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;

struct CacheSlot {
    data: OnceCell<Arc<ReferenceData>>,
    last_access: Mutex<Instant>,
}

impl CacheSlot {
    fn new() -> Self {
        Self {
            data: OnceCell::new(),
            last_access: Mutex::new(Instant::now()),
        }
    }

    fn last_access(&self) -> Instant {
        *self
            .last_access
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn touch(&self) {
        *self
            .last_access
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_access().elapsed() > ttl
    }
}

/// Reference data cache keyed by job
pub struct ReferenceDataCache {
    catalog: Arc<dyn CatalogClient>,
    ttl: Duration,
    slots: DashMap<JobExecutionId, Arc<CacheSlot>>,
}

impl ReferenceDataCache {
    /// Cache loading from `catalog`, expiring `ttl` after the last access
    pub fn new(catalog: Arc<dyn CatalogClient>, ttl: Duration) -> Self {
        Self {
            catalog,
            ttl,
            slots: DashMap::new(),
        }
    }

    /// Reference data of a job, loading it on first use
    ///
    /// # Errors
    ///
    /// Returns the catalog error when any entity type fails to load. The slot
    /// stays empty so the next call retries.
    pub async fn get(&self, job_id: &JobExecutionId) -> Result<Arc<ReferenceData>> {
        let slot = {
            let mut entry = self
                .slots
                .entry(*job_id)
                .or_insert_with(|| Arc::new(CacheSlot::new()));
            if entry.is_expired(self.ttl) {
                tracing::debug!(job_execution_id = %job_id, "Reference data expired, reloading");
                *entry = Arc::new(CacheSlot::new());
            }
            Arc::clone(entry.value())
        };
        slot.touch();

        let data = slot
            .data
            .get_or_try_init(|| self.load(job_id))
            .await?;
        Ok(Arc::clone(data))
    }

    async fn load(&self, job_id: &JobExecutionId) -> Result<Arc<ReferenceData>> {
        let tables = try_join_all(ENTITY_TYPES.iter().map(|entity| async move {
            let entries = self.catalog.fetch_reference_data(entity).await?;
            Ok::<_, crate::domain::BibExportError>((*entity, entries))
        }))
        .await?;

        let mut data = ReferenceData::new();
        let mut entries_total = 0usize;
        for (entity, entries) in tables {
            entries_total += entries.len();
            data.insert_table(entity, entries);
        }

        tracing::info!(
            job_execution_id = %job_id,
            entity_types = ENTITY_TYPES.len(),
            entries = entries_total,
            "Reference data loaded"
        );
        Ok(Arc::new(data))
    }

    /// Drop the job's slot; returns true if it held one
    pub fn release(&self, job_id: &JobExecutionId) -> bool {
        self.slots.remove(job_id).is_some()
    }

    /// Drop every slot idle for longer than the TTL; returns how many
    pub fn evict_expired(&self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_expired(self.ttl));
        before - self.slots.len()
    }

    /// Jobs currently holding a slot
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true when no job holds a slot
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
