//! Instance export
//!
//! Stored MARC records are preferred; an instance without one is generated
//! from its inventory JSON. When the profile includes holdings or items, the
//! related records are fetched once per chunk and attached to each instance.

use super::{
    affected_record, group_by, index_by_id, inventory_link, partition_identifiers,
    stored_content, ExportStrategy, StrategyContext,
};
use crate::adapters::catalog::MarcRecordType;
use crate::core::export::statistics::Statistics;
use crate::core::mapping::MappingInput;
use crate::domain::{ExportPayload, RecordType, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Instance export strategy
pub struct InstanceExportStrategy {
    context: StrategyContext,
}

/// Holdings and items of the instances in one chunk
#[derive(Default)]
struct Related {
    holdings_by_instance: HashMap<String, Vec<Value>>,
    items_by_holdings: HashMap<String, Vec<Value>>,
}

impl Related {
    fn record_for(&self, instance_id: &str, instance: Option<&Value>) -> Value {
        let holdings = self
            .holdings_by_instance
            .get(instance_id)
            .cloned()
            .unwrap_or_default();
        let items: Vec<Value> = holdings
            .iter()
            .filter_map(|h| h.get("id").and_then(Value::as_str))
            .filter_map(|hid| self.items_by_holdings.get(hid))
            .flatten()
            .cloned()
            .collect();
        json!({
            "instance": instance.cloned().unwrap_or_else(|| json!({})),
            "holdings": holdings,
            "items": items,
        })
    }
}

impl InstanceExportStrategy {
    /// Create a new InstanceExportStrategy
    pub fn new(context: StrategyContext) -> Self {
        Self { context }
    }

    async fn fetch_related(&self, instance_ids: &[String]) -> Result<Related> {
        let holdings = self
            .context
            .catalog
            .fetch_holdings_by_instance(instance_ids)
            .await?;
        let holdings_ids: Vec<String> = holdings
            .iter()
            .filter_map(|h| h.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        let items = if holdings_ids.is_empty() {
            Vec::new()
        } else {
            self.context
                .catalog
                .fetch_items_by_holdings(&holdings_ids)
                .await?
        };
        Ok(Related {
            holdings_by_instance: group_by(holdings, "instanceId"),
            items_by_holdings: group_by(items, "holdingsRecordId"),
        })
    }
}

#[async_trait]
impl ExportStrategy for InstanceExportStrategy {
    fn record_type(&self) -> RecordType {
        RecordType::Instance
    }

    async fn export(&self, payload: &ExportPayload) -> Result<Statistics> {
        let profile = &payload.mapping_profile;
        let mut stats = Statistics::new();
        let (ids, invalid) = partition_identifiers(&payload.identifiers);
        stats.invalid_ids = invalid;
        if ids.is_empty() {
            return Ok(stats);
        }

        let catalog = &self.context.catalog;
        let stored = group_by(
            catalog.fetch_marc_records(&ids, MarcRecordType::Bib).await?,
            "externalId",
        );
        let instances = index_by_id(catalog.fetch_instances(&ids).await?);

        let with_related = profile.has_record_type(RecordType::Holdings)
            || profile.has_record_type(RecordType::Item);
        let related = if with_related {
            let found: Vec<String> = ids
                .iter()
                .filter(|id| instances.contains_key(*id))
                .cloned()
                .collect();
            self.fetch_related(&found).await?
        } else {
            Related::default()
        };

        let mut inputs = Vec::with_capacity(ids.len());
        for id in &ids {
            let instance = instances.get(id);
            let stored_records = stored.get(id).and_then(|records| {
                if records.len() > 1 {
                    stats.add_duplicate(id.clone());
                }
                records.first()
            });
            if instance.is_none() && stored_records.is_none() {
                stats.not_found_ids.push(id.clone());
                continue;
            }

            let affected = affected_record(
                id,
                instance,
                RecordType::Instance,
                Some(inventory_link(id, None)),
            );
            let record = related.record_for(id, instance);
            inputs.push(match stored_records {
                Some(stored) => MappingInput::stored(stored_content(stored), record, affected),
                None => MappingInput::generated(record, affected),
            });
        }

        let attempted = inputs.len();
        let lines = self
            .context
            .mapping
            .map(
                &payload.job_execution_id,
                profile,
                RecordType::Instance,
                inputs,
            )
            .await?;
        self.context.write_output(payload, &lines).await?;
        stats.add_mapped(attempted, lines.len());

        tracing::debug!(
            job_execution_id = %payload.job_execution_id,
            identifiers = payload.identifiers.len(),
            stored = stored.len(),
            exported = stats.exported,
            not_found = stats.not_found_ids.len(),
            "Exported instance chunk"
        );
        Ok(stats)
    }
}
