//! MARC-in-JSON
//!
//! `{"leader": "...", "fields": [{"001": "..."}, {"245": {"ind1": "1", "ind2": "0",
//! "subfields": [{"a": "..."}]}}]}`. Stored source records use the same layout,
//! so this module both reads passthrough records and writes JSON output.

use super::record::{is_control_tag, DataField, MarcField, MarcRecord, Subfield, BLANK};
use crate::domain::MappingError;
use serde_json::{json, Map, Value};

/// Convert a record to MARC-in-JSON
pub fn to_json(record: &MarcRecord) -> Value {
    let fields: Vec<Value> = record
        .fields
        .iter()
        .map(|field| match field {
            MarcField::Control(c) => json!({ c.tag.clone(): c.value }),
            MarcField::Data(d) => {
                let subfields: Vec<Value> = d
                    .subfields
                    .iter()
                    .map(|s| json!({ s.code.to_string(): s.value }))
                    .collect();
                json!({
                    d.tag.clone(): {
                        "ind1": d.ind1.to_string(),
                        "ind2": d.ind2.to_string(),
                        "subfields": subfields,
                    }
                })
            }
        })
        .collect();
    json!({ "leader": record.leader, "fields": fields })
}

/// Read a record from MARC-in-JSON
///
/// # Errors
///
/// Returns [`MappingError::InvalidMarc`] when the document does not have the
/// expected shape.
pub fn from_json(value: &Value) -> Result<MarcRecord, MappingError> {
    let obj = value
        .as_object()
        .ok_or_else(|| MappingError::InvalidMarc("Record is not a JSON object".to_string()))?;
    let leader = obj
        .get("leader")
        .and_then(Value::as_str)
        .ok_or_else(|| MappingError::InvalidMarc("Record has no leader".to_string()))?;
    let fields = obj
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| MappingError::InvalidMarc("Record has no fields array".to_string()))?;

    let mut record = MarcRecord {
        leader: leader.to_string(),
        fields: Vec::with_capacity(fields.len()),
    };
    for entry in fields {
        let (tag, body) = single_entry(entry)?;
        if is_control_tag(tag) {
            let value = body.as_str().ok_or_else(|| {
                MappingError::InvalidMarc(format!("Control field {tag} is not a string"))
            })?;
            record.add_control_field(tag, value);
        } else {
            record.add_data_field(read_data_field(tag, body)?);
        }
    }
    Ok(record)
}

fn single_entry(entry: &Value) -> Result<(&str, &Value), MappingError> {
    entry
        .as_object()
        .and_then(|m| m.iter().next())
        .map(|(k, v)| (k.as_str(), v))
        .ok_or_else(|| MappingError::InvalidMarc(format!("Unexpected field entry {entry}")))
}

fn read_data_field(tag: &str, body: &Value) -> Result<DataField, MappingError> {
    let body: &Map<String, Value> = body
        .as_object()
        .ok_or_else(|| MappingError::InvalidMarc(format!("Data field {tag} is not an object")))?;
    let indicator = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .and_then(|s| s.chars().next())
            .unwrap_or(BLANK)
    };
    let mut field = DataField::new(tag, indicator("ind1"), indicator("ind2"));
    if let Some(subfields) = body.get("subfields").and_then(Value::as_array) {
        for sub in subfields {
            let (code, value) = single_entry(sub)?;
            let code = code.chars().next().ok_or_else(|| {
                MappingError::InvalidMarc(format!("Empty subfield code in {tag}"))
            })?;
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            field.subfields.push(Subfield::new(code, value));
        }
    }
    Ok(field)
}
