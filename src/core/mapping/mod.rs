//! Mapping service
//!
//! Turns one chunk of source records into encoded output records. Records are
//! mapped independently on the shared rayon pool; the async caller awaits the
//! whole batch through a oneshot channel. A record that fails, for any reason
//! including a panic, is reported to the error log and left out of the output.
//!
//! Compiled rule sets and reference data are cached per job until
//! [`MappingService::release`] is called at finalization.

use crate::core::processor::{RuleProcessor, TranslationFailure};
use crate::core::reference_data::{ReferenceData, ReferenceDataCache};
use crate::core::rules::RuleFactory;
use crate::core::state::ErrorLogService;
use crate::core::translation::TranslationRegistry;
use crate::domain::{
    AffectedRecord, BibExportError, JobExecutionId, MappingError, MappingProfile, OutputFormat,
    RecordType, Result,
};
use crate::marc::{self, MarcRecord};
use dashmap::DashMap;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde_json::Value;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Build the shared mapping pool
///
/// `threads == 0` lets rayon pick one thread per core.
///
/// # Errors
///
/// Returns [`BibExportError::Configuration`] if the pool cannot be started.
pub fn build_mapping_pool(threads: usize) -> Result<Arc<ThreadPool>> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("bibexport-map-{i}"))
        .build()
        .map(Arc::new)
        .map_err(|e| BibExportError::Configuration(format!("Failed to start mapping pool: {e}")))
}

/// Which rule set a processor was compiled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RuleSetKind {
    /// Records generated from inventory JSON
    Generated(RecordType),
    /// Holdings and item rules applied on top of a stored MARC record
    Overlay,
}

/// One record to map
#[derive(Debug, Clone)]
pub struct MappingInput {
    /// Inventory JSON: `{"instance": .., "holdings": [..], "items": [..]}`
    pub record: Value,
    /// Stored MARC-in-JSON record used as the base of the output
    pub stored: Option<Value>,
    /// Identifying fields for error reporting
    pub affected: AffectedRecord,
}

impl MappingInput {
    /// A record generated from inventory JSON
    pub fn generated(record: Value, affected: AffectedRecord) -> Self {
        Self {
            record,
            stored: None,
            affected,
        }
    }

    /// A record built from a stored MARC record
    pub fn stored(stored: Value, record: Value, affected: AffectedRecord) -> Self {
        Self {
            record,
            stored: Some(stored),
            affected,
        }
    }
}

struct RecordOutcome {
    affected: AffectedRecord,
    output: std::result::Result<String, MappingError>,
    translation_failures: Vec<TranslationFailure>,
}

/// Everything one worker needs, shared by the records of a batch
struct BatchContext {
    generated: Option<Arc<RuleProcessor>>,
    overlay: Option<Arc<RuleProcessor>>,
    reference_data: Arc<ReferenceData>,
    suppressed: HashSet<String>,
    format: OutputFormat,
}

impl BatchContext {
    fn map_record(&self, input: &MappingInput) -> RecordOutcome {
        let mut translation_failures = Vec::new();
        let output = catch_unwind(AssertUnwindSafe(|| {
            self.build(input, &mut |failure| translation_failures.push(failure))
        }))
        .unwrap_or_else(|panic| Err(MappingError::Panicked(panic_message(&panic))));

        RecordOutcome {
            affected: input.affected.clone(),
            output,
            translation_failures,
        }
    }

    fn build(
        &self,
        input: &MappingInput,
        report: &mut dyn FnMut(TranslationFailure),
    ) -> std::result::Result<String, MappingError> {
        if !input.record.is_object() {
            return Err(MappingError::MalformedRecord(format!(
                "expected a JSON object, got {}",
                json_kind(&input.record)
            )));
        }

        let mut record = match &input.stored {
            Some(stored) => {
                let base = marc::json::from_json(stored)?;
                match &self.overlay {
                    Some(overlay) => overlay.process_onto(
                        base,
                        &input.record,
                        &self.reference_data,
                        report,
                    ),
                    None => base,
                }
            }
            None => match &self.generated {
                Some(processor) => processor.process(&input.record, &self.reference_data, report),
                None => MarcRecord::new(),
            },
        };

        record.remove_tags(&self.suppressed);
        record.sort_fields();
        marc::encode(&record, self.format)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Mapping service
pub struct MappingService {
    pool: Arc<ThreadPool>,
    rule_factory: RuleFactory,
    registry: Arc<TranslationRegistry>,
    reference_data: Arc<ReferenceDataCache>,
    error_logs: Arc<ErrorLogService>,
    processors: DashMap<(JobExecutionId, RuleSetKind), Arc<RuleProcessor>>,
}

impl MappingService {
    /// Create a new MappingService
    ///
    /// # Arguments
    ///
    /// * `pool` - Shared mapping pool
    /// * `rule_factory` - Builds rule sets from profiles
    /// * `registry` - Translation functions
    /// * `reference_data` - Per-job reference data cache
    /// * `error_logs` - Receives per-record failures
    pub fn new(
        pool: Arc<ThreadPool>,
        rule_factory: RuleFactory,
        registry: Arc<TranslationRegistry>,
        reference_data: Arc<ReferenceDataCache>,
        error_logs: Arc<ErrorLogService>,
    ) -> Self {
        Self {
            pool,
            rule_factory,
            registry,
            reference_data,
            error_logs,
            processors: DashMap::new(),
        }
    }

    /// Map a batch of records
    ///
    /// Returns the encoded records that mapped successfully, in input order.
    /// The caller learns the failure count by comparing lengths.
    ///
    /// # Errors
    ///
    /// Returns an error only when the whole batch cannot be mapped: the rule
    /// set does not compile, reference data cannot be loaded, the error log
    /// cannot be written or the pool dropped the batch.
    pub async fn map(
        &self,
        job_id: &JobExecutionId,
        profile: &MappingProfile,
        record_type: RecordType,
        inputs: Vec<MappingInput>,
    ) -> Result<Vec<String>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let needs_generated = inputs.iter().any(|i| i.stored.is_none());
        let needs_overlay = inputs.iter().any(|i| i.stored.is_some())
            && record_type == RecordType::Instance
            && (profile.has_record_type(RecordType::Holdings)
                || profile.has_record_type(RecordType::Item));

        let context = BatchContext {
            generated: if needs_generated {
                Some(self.processor(job_id, profile, RuleSetKind::Generated(record_type))?)
            } else {
                None
            },
            overlay: if needs_overlay {
                Some(self.processor(job_id, profile, RuleSetKind::Overlay)?)
            } else {
                None
            },
            reference_data: self.reference_data.get(job_id).await?,
            suppressed: profile.suppressed_tags(),
            format: profile.output_format,
        };

        let total = inputs.len();
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(move || {
            let outcomes: Vec<RecordOutcome> = inputs
                .par_iter()
                .map(|input| context.map_record(input))
                .collect();
            let _ = tx.send(outcomes);
        });
        let outcomes = rx.await.map_err(|_| {
            BibExportError::Mapping(MappingError::Panicked(
                "mapping pool dropped the batch".to_string(),
            ))
        })?;

        let mut mapped = Vec::with_capacity(total);
        for outcome in outcomes {
            for failure in &outcome.translation_failures {
                self.error_logs
                    .record_translation_failure(job_id, outcome.affected.clone(), failure)
                    .await?;
            }
            match outcome.output {
                Ok(line) => mapped.push(line),
                Err(error) => {
                    tracing::warn!(
                        job_execution_id = %job_id,
                        record_id = %outcome.affected.id,
                        error = %error,
                        "Record could not be mapped"
                    );
                    self.error_logs
                        .record_mapping_failure(job_id, outcome.affected, &error)
                        .await?;
                }
            }
        }

        tracing::debug!(
            job_execution_id = %job_id,
            records = total,
            mapped = mapped.len(),
            "Mapped batch"
        );
        Ok(mapped)
    }

    /// Drop the job's compiled rule sets and reference data
    pub fn release(&self, job_id: &JobExecutionId) {
        self.processors.retain(|(job, _), _| job != job_id);
        self.reference_data.release(job_id);
    }

    /// Number of cached rule sets
    pub fn cached_rule_sets(&self) -> usize {
        self.processors.len()
    }

    fn processor(
        &self,
        job_id: &JobExecutionId,
        profile: &MappingProfile,
        kind: RuleSetKind,
    ) -> Result<Arc<RuleProcessor>> {
        if let Some(existing) = self.processors.get(&(*job_id, kind)) {
            return Ok(Arc::clone(existing.value()));
        }
        let rules = match kind {
            RuleSetKind::Generated(record_type) => self.rule_factory.create(profile, record_type),
            RuleSetKind::Overlay => self.rule_factory.create_for_stored_record(profile),
        };
        let processor = Arc::new(RuleProcessor::new(&rules, Arc::clone(&self.registry))?);
        tracing::debug!(
            job_execution_id = %job_id,
            kind = ?kind,
            rules = processor.rule_count(),
            "Compiled rule set"
        );
        Ok(Arc::clone(
            self.processors
                .entry((*job_id, kind))
                .or_insert(processor)
                .value(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::catalog::JsonCatalog;
    use crate::adapters::repository::{FileStateStore, Page};
    use crate::core::rules::DefaultRules;
    use crate::domain::{ErrorCode, Transformation};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;

    struct Fixture {
        service: MappingService,
        logs: Arc<ErrorLogService>,
        reference_data: Arc<ReferenceDataCache>,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(JsonCatalog::new());
        let logs = Arc::new(ErrorLogService::new(Arc::new(FileStateStore::in_memory())));
        let reference_data = Arc::new(ReferenceDataCache::new(catalog, Duration::from_secs(60)));
        let service = MappingService::new(
            build_mapping_pool(2).unwrap(),
            RuleFactory::new(Arc::new(DefaultRules::load().unwrap())),
            Arc::new(TranslationRegistry::new()),
            Arc::clone(&reference_data),
            Arc::clone(&logs),
        );
        Fixture {
            service,
            logs,
            reference_data,
        }
    }

    fn affected(id: &str) -> AffectedRecord {
        AffectedRecord {
            id: id.to_string(),
            hrid: None,
            title: None,
            record_type: RecordType::Instance,
            inventory_link: None,
        }
    }

    fn title_profile(format: OutputFormat) -> MappingProfile {
        let mut profile = MappingProfile::default_instance();
        profile.default = false;
        profile.output_format = format;
        profile.transformations = vec![Transformation {
            field_id: "instance.title".to_string(),
            path: "$.instance.title".to_string(),
            transformation: "24510$a".to_string(),
            record_type: RecordType::Instance,
            enabled: true,
            metadata_parameters: BTreeMap::new(),
        }];
        profile
    }

    fn instance(title: &str) -> Value {
        json!({ "instance": { "id": "i", "hrid": "in1", "title": title } })
    }

    #[tokio::test]
    async fn test_malformed_record_is_isolated() {
        let f = fixture();
        let job = JobExecutionId::generate();
        let profile = title_profile(OutputFormat::Json);
        let inputs = vec![
            MappingInput::generated(instance("One"), affected("r1")),
            MappingInput::generated(json!("not a record"), affected("r2")),
            MappingInput::generated(instance("Three"), affected("r3")),
        ];

        let out = f
            .service
            .map(&job, &profile, RecordType::Instance, inputs)
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        assert!(out[0].contains("One"));
        assert!(out[1].contains("Three"));
        let logs = f.logs.logs_for(&job, Page::all()).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].error_message_code, ErrorCode::ErrorMappingRecord);
        assert_eq!(logs[0].affected_record.as_ref().unwrap().id, "r2");
    }

    #[tokio::test]
    async fn test_invalid_stored_record_is_isolated() {
        let f = fixture();
        let job = JobExecutionId::generate();
        let inputs = vec![
            MappingInput::stored(
                json!({ "leader": "00000nam a2200000 a 4500", "fields": [{ "001": "in1" }] }),
                json!({}),
                affected("ok"),
            ),
            MappingInput::stored(json!({ "fields": 7 }), json!({}), affected("bad")),
        ];
        let out = f
            .service
            .map(
                &job,
                &MappingProfile::default_instance(),
                RecordType::Instance,
                inputs,
            )
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        let logs = f.logs.logs_for(&job, Page::all()).await.unwrap();
        assert_eq!(logs[0].affected_record.as_ref().unwrap().id, "bad");
    }

    #[tokio::test]
    async fn test_suppression_applies() {
        let f = fixture();
        let job = JobExecutionId::generate();
        let mut profile = title_profile(OutputFormat::Json);
        profile.suppression = vec!["245".to_string()];
        let out = f
            .service
            .map(
                &job,
                &profile,
                RecordType::Instance,
                vec![MappingInput::generated(instance("Hidden"), affected("r1"))],
            )
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(!out[0].contains("Hidden"));
    }

    #[tokio::test]
    async fn test_job_caches_held_until_release() {
        let f = fixture();
        let job = JobExecutionId::generate();
        let profile = title_profile(OutputFormat::Marc);
        for _ in 0..2 {
            f.service
                .map(
                    &job,
                    &profile,
                    RecordType::Instance,
                    vec![MappingInput::generated(instance("T"), affected("r"))],
                )
                .await
                .unwrap();
        }
        assert_eq!(f.service.cached_rule_sets(), 1);
        assert_eq!(f.reference_data.len(), 1);
        f.service.release(&job);
        assert_eq!(f.service.cached_rule_sets(), 0);
        assert!(f.reference_data.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let f = fixture();
        let out = f
            .service
            .map(
                &JobExecutionId::generate(),
                &MappingProfile::default_instance(),
                RecordType::Instance,
                Vec::new(),
            )
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
