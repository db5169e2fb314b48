//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bibexport::adapters::catalog::{CatalogClient, JsonCatalog, MarcRecordType};
use bibexport::adapters::factory::Collaborators;
use bibexport::adapters::repository::FileStateStore;
use bibexport::adapters::source::FileSourceReaderFactory;
use bibexport::adapters::storage::LocalStorage;
use bibexport::config::BibExportConfig;
use bibexport::core::export::ExportService;
use bibexport::domain::{BibExportError, Result};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Deterministic record id
pub fn record_id(n: u32) -> String {
    format!("00000000-0000-4000-8000-{n:012}")
}

/// Inventory instance with a title and hrid
pub fn instance(n: u32, title: &str) -> Value {
    json!({
        "id": record_id(n),
        "hrid": format!("in{n:011}"),
        "title": title,
        "metadata": {
            "createdDate": "2020-01-15T10:00:00.000+00:00",
            "updatedDate": "2021-03-02T08:30:00.000+00:00"
        }
    })
}

/// Stored MARC bib record linked to instance `n`
pub fn stored_bib(n: u32, content: Value) -> Value {
    json!({
        "id": format!("srs-{n}"),
        "externalId": record_id(n),
        "recordType": "MARC_BIB",
        "content": content,
    })
}

/// Stored MARC authority record
pub fn stored_authority(n: u32, content: Value) -> Value {
    json!({
        "id": format!("auth-{n}"),
        "externalId": record_id(n),
        "recordType": "MARC_AUTHORITY",
        "content": content,
    })
}

/// Minimal MARC-in-JSON content
pub fn marc_content(control_number: &str, title: &str) -> Value {
    json!({
        "leader": "00000nam a2200000 a 4500",
        "fields": [
            {"001": control_number},
            {"245": {"ind1": "1", "ind2": "0", "subfields": [{"a": title}]}},
            {"999": {"ind1": "f", "ind2": "f", "subfields": [{"s": "srs"}]}}
        ]
    })
}

/// Catalog that fails every fetch touching one of `poisoned`
pub struct FlakyCatalog {
    inner: JsonCatalog,
    poisoned: HashSet<String>,
}

impl FlakyCatalog {
    pub fn new(inner: JsonCatalog, poisoned: impl IntoIterator<Item = String>) -> Self {
        Self {
            inner,
            poisoned: poisoned.into_iter().collect(),
        }
    }

    fn check(&self, ids: &[String]) -> Result<()> {
        if ids.iter().any(|id| self.poisoned.contains(id)) {
            return Err(BibExportError::Catalog("catalog unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogClient for FlakyCatalog {
    async fn fetch_instances(&self, ids: &[String]) -> Result<Vec<Value>> {
        self.check(ids)?;
        self.inner.fetch_instances(ids).await
    }

    async fn fetch_holdings(&self, ids: &[String]) -> Result<Vec<Value>> {
        self.check(ids)?;
        self.inner.fetch_holdings(ids).await
    }

    async fn fetch_holdings_by_instance(&self, instance_ids: &[String]) -> Result<Vec<Value>> {
        self.inner.fetch_holdings_by_instance(instance_ids).await
    }

    async fn fetch_items_by_holdings(&self, holdings_ids: &[String]) -> Result<Vec<Value>> {
        self.inner.fetch_items_by_holdings(holdings_ids).await
    }

    async fn fetch_marc_records(
        &self,
        external_ids: &[String],
        record_type: MarcRecordType,
    ) -> Result<Vec<Value>> {
        self.check(external_ids)?;
        self.inner.fetch_marc_records(external_ids, record_type).await
    }

    async fn fetch_reference_data(&self, entity: &str) -> Result<Vec<Value>> {
        self.inner.fetch_reference_data(entity).await
    }
}

/// A wired service over a temporary directory
pub struct TestEnv {
    pub dir: TempDir,
    pub service: ExportService,
}

impl TestEnv {
    /// Service over `catalog` with the given chunk size
    pub fn new(catalog: Arc<dyn CatalogClient>, batch_size: usize) -> Self {
        Self::with_timeout(catalog, batch_size, 60)
    }

    /// Service with a custom job timeout
    pub fn with_timeout(
        catalog: Arc<dyn CatalogClient>,
        batch_size: usize,
        job_timeout_minutes: u64,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = BibExportConfig::default();
        config.export.batch_size = batch_size;
        config.export.mapping_threads = 2;
        config.export.job_timeout_minutes = job_timeout_minutes;

        let collaborators = Collaborators {
            catalog,
            storage: Arc::new(LocalStorage::new(dir.path().join("out"))),
            state: Arc::new(FileStateStore::in_memory()),
            readers: Arc::new(FileSourceReaderFactory::new(Some(dir.path().to_path_buf()))),
        };
        let service = ExportService::assemble(&config, collaborators).unwrap();
        Self { dir, service }
    }

    /// Write an identifier file and return its name
    pub fn write_ids(&self, name: &str, ids: &[String]) -> String {
        let mut contents = ids.join("\n");
        contents.push('\n');
        std::fs::write(self.dir.path().join(name), contents).unwrap();
        name.to_string()
    }

    /// Absolute path of an output file
    pub fn output_path(&self, relative: &str) -> PathBuf {
        self.dir.path().join("out").join(relative)
    }

    /// Bytes of an output file
    pub fn read_output(&self, relative: &str) -> Vec<u8> {
        std::fs::read(self.output_path(relative)).unwrap()
    }
}

/// Split ISO 2709 output into records
pub fn split_records(bytes: &[u8]) -> Vec<&[u8]> {
    bytes
        .split_inclusive(|b| *b == 0x1D)
        .filter(|r| !r.is_empty())
        .collect()
}
