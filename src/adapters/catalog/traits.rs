//! Catalog collaborator trait
//!
//! Bulk fetches of source records and reference data. Every method returns the
//! records it found; ids with no record are simply absent from the result,
//! which callers treat as the "not found" signal.

use crate::domain::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Stored MARC record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarcRecordType {
    /// Bibliographic record linked to an instance
    Bib,
    /// Authority record
    Authority,
}

impl MarcRecordType {
    /// Value of the `recordType` attribute of stored records
    pub fn as_str(&self) -> &'static str {
        match self {
            MarcRecordType::Bib => "MARC_BIB",
            MarcRecordType::Authority => "MARC_AUTHORITY",
        }
    }
}

/// Catalog client
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Instances by id
    async fn fetch_instances(&self, ids: &[String]) -> Result<Vec<Value>>;

    /// Holdings by id
    async fn fetch_holdings(&self, ids: &[String]) -> Result<Vec<Value>>;

    /// Holdings whose `instanceId` is one of `instance_ids`
    async fn fetch_holdings_by_instance(&self, instance_ids: &[String]) -> Result<Vec<Value>>;

    /// Items whose `holdingsRecordId` is one of `holdings_ids`
    async fn fetch_items_by_holdings(&self, holdings_ids: &[String]) -> Result<Vec<Value>>;

    /// Stored MARC records whose `externalId` is one of `external_ids`
    ///
    /// Each record carries `id`, `externalId`, `recordType` and `content`
    /// (MARC-in-JSON). One external id may have several records.
    async fn fetch_marc_records(
        &self,
        external_ids: &[String],
        record_type: MarcRecordType,
    ) -> Result<Vec<Value>>;

    /// All entries of one reference data entity type
    async fn fetch_reference_data(&self, entity: &str) -> Result<Vec<Value>>;
}
