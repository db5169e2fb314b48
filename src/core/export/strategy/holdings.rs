//! Holdings export
//!
//! Holdings are always generated from inventory JSON, together with their
//! instance and items.

use super::{
    affected_record, group_by, index_by_id, inventory_link, partition_identifiers,
    ExportStrategy, StrategyContext,
};
use crate::core::export::statistics::Statistics;
use crate::core::mapping::MappingInput;
use crate::domain::{ExportPayload, RecordType, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Holdings export strategy
pub struct HoldingsExportStrategy {
    context: StrategyContext,
}

impl HoldingsExportStrategy {
    /// Create a new HoldingsExportStrategy
    pub fn new(context: StrategyContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ExportStrategy for HoldingsExportStrategy {
    fn record_type(&self) -> RecordType {
        RecordType::Holdings
    }

    async fn export(&self, payload: &ExportPayload) -> Result<Statistics> {
        let mut stats = Statistics::new();
        let (ids, invalid) = partition_identifiers(&payload.identifiers);
        stats.invalid_ids = invalid;
        if ids.is_empty() {
            return Ok(stats);
        }

        let catalog = &self.context.catalog;
        let holdings = index_by_id(catalog.fetch_holdings(&ids).await?);
        let mut instance_ids: Vec<String> = holdings
            .values()
            .filter_map(|h| h.get("instanceId").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        instance_ids.sort();
        instance_ids.dedup();
        let instances = if instance_ids.is_empty() {
            Default::default()
        } else {
            index_by_id(catalog.fetch_instances(&instance_ids).await?)
        };
        let found: Vec<String> = ids
            .iter()
            .filter(|id| holdings.contains_key(*id))
            .cloned()
            .collect();
        let items = if found.is_empty() {
            Default::default()
        } else {
            group_by(
                catalog.fetch_items_by_holdings(&found).await?,
                "holdingsRecordId",
            )
        };

        let mut inputs = Vec::with_capacity(found.len());
        for id in &ids {
            let Some(holding) = holdings.get(id) else {
                stats.not_found_ids.push(id.clone());
                continue;
            };
            let instance_id = holding.get("instanceId").and_then(Value::as_str);
            let instance = instance_id.and_then(|iid| instances.get(iid));

            let mut affected = affected_record(
                id,
                Some(holding),
                RecordType::Holdings,
                instance_id.map(|iid| inventory_link(iid, Some(id))),
            );
            affected.title = instance
                .and_then(|i| i.get("title"))
                .and_then(Value::as_str)
                .map(str::to_string);

            let record = json!({
                "holdings": [holding],
                "instance": instance.cloned().unwrap_or_else(|| json!({})),
                "items": items.get(id).cloned().unwrap_or_default(),
            });
            inputs.push(MappingInput::generated(record, affected));
        }

        let attempted = inputs.len();
        let lines = self
            .context
            .mapping
            .map(
                &payload.job_execution_id,
                &payload.mapping_profile,
                RecordType::Holdings,
                inputs,
            )
            .await?;
        self.context.write_output(payload, &lines).await?;
        stats.add_mapped(attempted, lines.len());
        Ok(stats)
    }
}
