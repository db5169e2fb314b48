//! Intermediate values read from a record

use super::path::JsonPath;
use serde_json::Value;

/// One string read for a data source of a repeatable group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringValue {
    /// Index of the data source within its rule
    pub source: usize,
    /// Raw value; empty for literal sources
    pub value: String,
}

impl StringValue {
    /// Value for the data source at `source`
    pub fn new(source: usize, value: impl Into<String>) -> Self {
        Self {
            source,
            value: value.into(),
        }
    }
}

/// Result of reading a data source (or a whole repeatable rule)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValue {
    /// Nothing found
    Missing,
    /// One string
    Single(String),
    /// Several strings for the same data source
    List(Vec<String>),
    /// One inner list per repeated group, each becoming its own field
    Composite(Vec<Vec<StringValue>>),
}

impl RuleValue {
    /// Returns true for [`RuleValue::Missing`]
    pub fn is_missing(&self) -> bool {
        matches!(self, RuleValue::Missing)
    }

    /// Strings of a simple value
    pub fn strings(&self) -> Vec<&str> {
        match self {
            RuleValue::Missing | RuleValue::Composite(_) => Vec::new(),
            RuleValue::Single(s) => vec![s.as_str()],
            RuleValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// Scalars under `node`; arrays are flattened one level, objects and nulls skipped
pub fn scalars(node: &Value, out: &mut Vec<String>) {
    match node {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Array(_) | Value::Object(_) | Value::Null => {}
                    scalar => scalars(scalar, out),
                }
            }
        }
        Value::Object(_) | Value::Null => {}
    }
}

/// Read a simple value for `path`
///
/// Multi-selecting paths always give a list, so a wildcard that happens to
/// match a single element still repeats correctly.
pub fn read_simple(path: &JsonPath, record: &Value) -> RuleValue {
    let nodes = path.select(record);
    let repeatable = path.is_multi() || nodes.iter().any(|n| n.is_array());
    let mut values = Vec::new();
    for node in nodes {
        scalars(node, &mut values);
    }
    match values.len() {
        0 => RuleValue::Missing,
        1 if !repeatable => values.pop().map_or(RuleValue::Missing, RuleValue::Single),
        _ => RuleValue::List(values),
    }
}

/// Strings of `path` relative to `node`
pub fn read_strings(path: &JsonPath, node: &Value) -> Vec<String> {
    let mut values = Vec::new();
    for selected in path.select(node) {
        scalars(selected, &mut values);
    }
    values
}
