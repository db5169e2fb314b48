//! Catalog backed by JSON snapshot files
//!
//! The data directory holds one JSON array per collection:
//!
//! ```text
//! <data_dir>/instances.json
//! <data_dir>/holdings.json
//! <data_dir>/items.json
//! <data_dir>/marc_records.json
//! <data_dir>/reference_data/<entity>.json
//! ```
//!
//! Missing files are treated as empty collections.

use super::traits::{CatalogClient, MarcRecordType};
use crate::domain::context::ResultExt;
use crate::domain::{BibExportError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// In-memory catalog
#[derive(Debug, Clone, Default)]
pub struct JsonCatalog {
    instances: HashMap<String, Value>,
    holdings: HashMap<String, Value>,
    items: Vec<Value>,
    marc_records: Vec<Value>,
    reference_data: HashMap<String, Vec<Value>>,
}

impl JsonCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every collection from `data_dir`
    ///
    /// # Errors
    ///
    /// Returns [`BibExportError::Catalog`] when a present file is not a JSON
    /// array.
    pub async fn from_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        let mut catalog = Self::new()
            .with_instances(read_array(&dir.join("instances.json")).await?)
            .with_holdings(read_array(&dir.join("holdings.json")).await?)
            .with_items(read_array(&dir.join("items.json")).await?)
            .with_marc_records(read_array(&dir.join("marc_records.json")).await?);

        let ref_dir = dir.join("reference_data");
        if tokio::fs::try_exists(&ref_dir).await.unwrap_or(false) {
            let mut entries = tokio::fs::read_dir(&ref_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Some(entity) = path.file_stem().and_then(|s| s.to_str()) {
                    let entity = entity.to_string();
                    catalog
                        .reference_data
                        .insert(entity, read_array(&path).await?);
                }
            }
        }

        tracing::info!(
            data_dir = %dir.display(),
            instances = catalog.instances.len(),
            holdings = catalog.holdings.len(),
            items = catalog.items.len(),
            marc_records = catalog.marc_records.len(),
            reference_entities = catalog.reference_data.len(),
            "Catalog snapshot loaded"
        );
        Ok(catalog)
    }

    /// Add instances
    pub fn with_instances(mut self, records: Vec<Value>) -> Self {
        index_by_id(&mut self.instances, records);
        self
    }

    /// Add holdings
    pub fn with_holdings(mut self, records: Vec<Value>) -> Self {
        index_by_id(&mut self.holdings, records);
        self
    }

    /// Add items
    pub fn with_items(mut self, records: Vec<Value>) -> Self {
        self.items.extend(records);
        self
    }

    /// Add stored MARC records
    pub fn with_marc_records(mut self, records: Vec<Value>) -> Self {
        self.marc_records.extend(records);
        self
    }

    /// Add one reference data table
    pub fn with_reference_data(mut self, entity: impl Into<String>, entries: Vec<Value>) -> Self {
        self.reference_data.insert(entity.into(), entries);
        self
    }
}

fn index_by_id(map: &mut HashMap<String, Value>, records: Vec<Value>) {
    for record in records {
        if let Some(id) = record.get("id").and_then(Value::as_str) {
            map.insert(id.to_string(), record);
        }
    }
}

async fn read_array(path: &Path) -> Result<Vec<Value>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(Vec::new());
    }
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| {
        BibExportError::Catalog(format!("Failed to parse {}: {e}", path.display()))
    })?;
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(BibExportError::Catalog(format!(
            "{} must contain a JSON array",
            path.display()
        ))),
    }
}

fn matches_field(record: &Value, field: &str, wanted: &HashSet<&str>) -> bool {
    record
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|v| wanted.contains(v))
}

#[async_trait]
impl CatalogClient for JsonCatalog {
    async fn fetch_instances(&self, ids: &[String]) -> Result<Vec<Value>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.instances.get(id).cloned())
            .collect())
    }

    async fn fetch_holdings(&self, ids: &[String]) -> Result<Vec<Value>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.holdings.get(id).cloned())
            .collect())
    }

    async fn fetch_holdings_by_instance(&self, instance_ids: &[String]) -> Result<Vec<Value>> {
        let wanted: HashSet<&str> = instance_ids.iter().map(String::as_str).collect();
        let mut found: Vec<Value> = self
            .holdings
            .values()
            .filter(|h| matches_field(h, "instanceId", &wanted))
            .cloned()
            .collect();
        // HashMap order is arbitrary; keep output deterministic
        found.sort_by(|a, b| {
            let key = |v: &Value| v.get("hrid").and_then(Value::as_str).map(str::to_string);
            key(a).cmp(&key(b))
        });
        Ok(found)
    }

    async fn fetch_items_by_holdings(&self, holdings_ids: &[String]) -> Result<Vec<Value>> {
        let wanted: HashSet<&str> = holdings_ids.iter().map(String::as_str).collect();
        Ok(self
            .items
            .iter()
            .filter(|i| matches_field(i, "holdingsRecordId", &wanted))
            .cloned()
            .collect())
    }

    async fn fetch_marc_records(
        &self,
        external_ids: &[String],
        record_type: MarcRecordType,
    ) -> Result<Vec<Value>> {
        let wanted: HashSet<&str> = external_ids.iter().map(String::as_str).collect();
        Ok(self
            .marc_records
            .iter()
            .filter(|r| matches_field(r, "externalId", &wanted))
            .filter(|r| {
                r.get("recordType")
                    .and_then(Value::as_str)
                    .map_or(true, |t| t == record_type.as_str())
            })
            .cloned()
            .collect())
    }

    async fn fetch_reference_data(&self, entity: &str) -> Result<Vec<Value>> {
        Ok(self.reference_data.get(entity).cloned().unwrap_or_default())
    }
}
