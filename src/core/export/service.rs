//! Export service wiring
//!
//! Assembles the mapping pool, caches, state services and orchestrator from
//! configuration and a set of collaborators.

use super::coordinator::{ExportOrchestrator, OrchestratorSettings};
use super::expiry::ExpirySweep;
use super::strategy::{StrategyContext, StrategyTable};
use crate::adapters::factory::Collaborators;
use crate::adapters::repository::ProfileRepository;
use crate::config::BibExportConfig;
use crate::core::mapping::{build_mapping_pool, MappingService};
use crate::core::reference_data::ReferenceDataCache;
use crate::core::rules::{DefaultRules, RuleFactory};
use crate::core::state::{ErrorLogService, JobExecutionManager};
use crate::core::translation::TranslationRegistry;
use crate::domain::Result;
use std::sync::Arc;
use std::time::Duration;

/// A fully wired export service
pub struct ExportService {
    /// Runs export jobs
    pub orchestrator: Arc<ExportOrchestrator>,
    /// Job state
    pub jobs: Arc<JobExecutionManager>,
    /// Job error trail
    pub error_logs: Arc<ErrorLogService>,
    /// Stored mapping profiles
    pub profiles: Arc<dyn ProfileRepository>,
    /// Closes stale jobs
    pub expiry: Arc<ExpirySweep>,
    /// Per-job reference data
    pub reference_data: Arc<ReferenceDataCache>,
}

impl ExportService {
    /// Wire a service from configuration and collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `collaborators` - Catalog, storage, state store and identifier readers
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled default rules fail to parse or the
    /// mapping pool cannot be started.
    pub fn assemble(config: &BibExportConfig, collaborators: Collaborators) -> Result<Self> {
        let Collaborators {
            catalog,
            storage,
            state,
            readers,
        } = collaborators;

        let jobs = Arc::new(JobExecutionManager::new(state.clone()));
        let error_logs = Arc::new(ErrorLogService::new(state.clone()));

        let defaults = Arc::new(DefaultRules::load()?);
        let reference_data = Arc::new(ReferenceDataCache::new(
            catalog.clone(),
            Duration::from_secs(config.reference_data.cache_ttl_seconds),
        ));
        let pool = build_mapping_pool(config.export.mapping_threads)?;
        let mapping = Arc::new(MappingService::new(
            pool,
            RuleFactory::new(defaults),
            Arc::new(TranslationRegistry::new()),
            reference_data.clone(),
            error_logs.clone(),
        ));

        let strategies = StrategyTable::standard(StrategyContext {
            catalog,
            mapping: mapping.clone(),
            storage: storage.clone(),
        });

        let orchestrator = Arc::new(ExportOrchestrator::new(
            jobs.clone(),
            error_logs.clone(),
            storage,
            readers,
            strategies,
            mapping,
            OrchestratorSettings {
                batch_size: config.export.batch_size,
                max_concurrent_jobs: config.export.max_concurrent_jobs,
            },
        ));

        let expiry = Arc::new(
            ExpirySweep::new(
                jobs.clone(),
                error_logs.clone(),
                config.export.job_timeout_minutes,
            )
            .with_registry(orchestrator.registry().clone())
            .with_reference_data(reference_data.clone()),
        );

        tracing::debug!(
            batch_size = config.export.batch_size,
            max_concurrent_jobs = config.export.max_concurrent_jobs,
            "Export service assembled"
        );

        Ok(Self {
            orchestrator,
            jobs,
            error_logs,
            profiles: state,
            expiry,
            reference_data,
        })
    }

    /// Load collaborators from configuration and wire a service
    ///
    /// # Errors
    ///
    /// Returns an error if a collaborator fails to initialize or the service
    /// cannot be assembled.
    pub async fn from_config(config: &BibExportConfig) -> Result<Self> {
        let collaborators = Collaborators::from_config(config).await?;
        Self::assemble(config, collaborators)
    }
}
