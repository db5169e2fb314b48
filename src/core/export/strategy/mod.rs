//! Export strategies
//!
//! One strategy per exported record type. A strategy resolves one chunk of
//! identifiers against the catalog, maps what it found and appends the output.
//! The orchestrator picks the strategy from a [`StrategyTable`].

pub mod authority;
pub mod holdings;
pub mod instance;

pub use authority::AuthorityExportStrategy;
pub use holdings::HoldingsExportStrategy;
pub use instance::InstanceExportStrategy;

use super::statistics::Statistics;
use crate::adapters::catalog::CatalogClient;
use crate::adapters::storage::Storage;
use crate::core::mapping::MappingService;
use crate::domain::ids::is_valid_record_id;
use crate::domain::{
    AffectedRecord, BibExportError, ExportPayload, MappingProfile, RecordType, Result,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Exports one chunk of identifiers of a single record type
#[async_trait]
pub trait ExportStrategy: Send + Sync {
    /// Record type of the identifiers this strategy accepts
    fn record_type(&self) -> RecordType;

    /// Export the identifiers of `payload`
    ///
    /// # Errors
    ///
    /// Returns an error for infrastructure failures (catalog, storage, error
    /// log). Per-record failures are counted in the statistics instead.
    async fn export(&self, payload: &ExportPayload) -> Result<Statistics>;
}

/// Collaborators shared by every strategy
#[derive(Clone)]
pub struct StrategyContext {
    /// Source records
    pub catalog: Arc<dyn CatalogClient>,
    /// Record mapping
    pub mapping: Arc<MappingService>,
    /// Output files
    pub storage: Arc<dyn Storage>,
}

impl StrategyContext {
    /// Append mapped lines to the job's output file
    pub(crate) async fn write_output(&self, payload: &ExportPayload, lines: &[String]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let content = lines.concat();
        self.storage
            .append(
                &payload.file_export_definition.output_path,
                content.as_bytes(),
            )
            .await
    }
}

/// Strategy lookup by record type
pub struct StrategyTable {
    strategies: HashMap<RecordType, Arc<dyn ExportStrategy>>,
}

impl StrategyTable {
    /// Empty table
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Table with the instance, holdings and authority strategies
    pub fn standard(context: StrategyContext) -> Self {
        Self::empty()
            .with_strategy(Arc::new(InstanceExportStrategy::new(context.clone())))
            .with_strategy(Arc::new(HoldingsExportStrategy::new(context.clone())))
            .with_strategy(Arc::new(AuthorityExportStrategy::new(context)))
    }

    /// Register a strategy under its record type
    pub fn with_strategy(mut self, strategy: Arc<dyn ExportStrategy>) -> Self {
        self.strategies.insert(strategy.record_type(), strategy);
        self
    }

    /// Strategy for `record_type`; item identifiers are not exported directly
    ///
    /// # Errors
    ///
    /// Returns [`BibExportError::Validation`] when no strategy is registered.
    pub fn get(&self, record_type: RecordType) -> Result<Arc<dyn ExportStrategy>> {
        self.strategies
            .get(&record_type)
            .cloned()
            .ok_or_else(|| {
                BibExportError::Validation(format!(
                    "No export strategy for record type {record_type}"
                ))
            })
    }
}

/// Record type of the identifiers a profile exports when none is given
///
/// Authority profiles export authorities, profiles with instances export
/// instances, anything else exports holdings.
pub fn export_record_type(profile: &MappingProfile) -> RecordType {
    if profile.has_record_type(RecordType::Authority) {
        RecordType::Authority
    } else if profile.has_record_type(RecordType::Instance) {
        RecordType::Instance
    } else {
        RecordType::Holdings
    }
}

/// Split identifiers into well-formed and invalid ones, keeping input order
pub(crate) fn partition_identifiers(identifiers: &[String]) -> (Vec<String>, Vec<String>) {
    identifiers
        .iter()
        .map(|id| id.trim().to_string())
        .partition(|id| is_valid_record_id(id))
}

/// Group records by a string attribute, keeping fetch order inside a group
pub(crate) fn group_by(records: Vec<Value>, key: &str) -> HashMap<String, Vec<Value>> {
    let mut groups: HashMap<String, Vec<Value>> = HashMap::new();
    for record in records {
        if let Some(k) = record.get(key).and_then(Value::as_str) {
            groups.entry(k.to_string()).or_default().push(record);
        }
    }
    groups
}

/// Index records by `id`
pub(crate) fn index_by_id(records: Vec<Value>) -> HashMap<String, Value> {
    records
        .into_iter()
        .filter_map(|r| {
            let id = r.get("id").and_then(Value::as_str)?.to_string();
            Some((id, r))
        })
        .collect()
}

/// Identifying fields of a record for the error log
pub(crate) fn affected_record(
    id: &str,
    source: Option<&Value>,
    record_type: RecordType,
    inventory_link: Option<String>,
) -> AffectedRecord {
    let text = |key: &str| {
        source
            .and_then(|s| s.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    AffectedRecord {
        id: id.to_string(),
        hrid: text("hrid"),
        title: text("title"),
        record_type,
        inventory_link,
    }
}

/// Link to an instance, optionally a holdings record of it, in the catalog UI
pub(crate) fn inventory_link(instance_id: &str, holdings_id: Option<&str>) -> String {
    match holdings_id {
        Some(holdings_id) => format!("/inventory/view/{instance_id}/{holdings_id}"),
        None => format!("/inventory/view/{instance_id}"),
    }
}

/// Content of a stored MARC record
pub(crate) fn stored_content(stored: &Value) -> Value {
    stored.get("content").cloned().unwrap_or(Value::Null)
}
