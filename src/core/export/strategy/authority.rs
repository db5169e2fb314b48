//! Authority export
//!
//! Authorities exist only as stored MARC records, which are passed through
//! with suppression applied.

use super::{group_by, partition_identifiers, stored_content, ExportStrategy, StrategyContext};
use crate::adapters::catalog::MarcRecordType;
use crate::core::export::statistics::Statistics;
use crate::core::mapping::MappingInput;
use crate::domain::{AffectedRecord, ExportPayload, RecordType, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Authority export strategy
pub struct AuthorityExportStrategy {
    context: StrategyContext,
}

impl AuthorityExportStrategy {
    /// Create a new AuthorityExportStrategy
    pub fn new(context: StrategyContext) -> Self {
        Self { context }
    }
}

/// First value of a control field in MARC-in-JSON content
fn control_field<'a>(content: &'a Value, tag: &str) -> Option<&'a str> {
    content
        .get("fields")?
        .as_array()?
        .iter()
        .find_map(|f| f.get(tag).and_then(Value::as_str))
}

#[async_trait]
impl ExportStrategy for AuthorityExportStrategy {
    fn record_type(&self) -> RecordType {
        RecordType::Authority
    }

    async fn export(&self, payload: &ExportPayload) -> Result<Statistics> {
        let mut stats = Statistics::new();
        let (ids, invalid) = partition_identifiers(&payload.identifiers);
        stats.invalid_ids = invalid;
        if ids.is_empty() {
            return Ok(stats);
        }

        let stored = group_by(
            self.context
                .catalog
                .fetch_marc_records(&ids, MarcRecordType::Authority)
                .await?,
            "externalId",
        );

        let mut inputs = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(records) = stored.get(id) else {
                stats.not_found_ids.push(id.clone());
                continue;
            };
            if records.len() > 1 {
                stats.add_duplicate(id.clone());
            }
            let Some(first) = records.first() else {
                stats.not_found_ids.push(id.clone());
                continue;
            };
            let content = stored_content(first);
            let affected = AffectedRecord {
                id: id.clone(),
                hrid: control_field(&content, "001").map(str::to_string),
                title: None,
                record_type: RecordType::Authority,
                inventory_link: None,
            };
            inputs.push(MappingInput::stored(content, json!({}), affected));
        }

        let attempted = inputs.len();
        let lines = self
            .context
            .mapping
            .map(
                &payload.job_execution_id,
                &payload.mapping_profile,
                RecordType::Authority,
                inputs,
            )
            .await?;
        self.context.write_output(payload, &lines).await?;
        stats.add_mapped(attempted, lines.len());
        Ok(stats)
    }
}
