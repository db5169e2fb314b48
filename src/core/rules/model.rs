//! Rule model
//!
//! A rule names an output tag (or `leader`) and the data sources that feed it.
//! Rules are built once per job and shared read-only by every mapping worker.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Tag sentinel for the leader rule
pub const LEADER: &str = "leader";

/// Named value transform with constant parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// Registered function name
    pub function: String,
    /// Constant parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl Translation {
    /// Translation without parameters
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// `set_value` translation producing a constant
    pub fn constant(value: impl Into<String>) -> Self {
        Self::new("set_value").with_parameter("value", value)
    }

    /// Add a parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// One input of a rule
///
/// With neither `subfield` nor `indicator` set the source feeds a control
/// field (or the leader); otherwise it feeds one subfield or indicator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataSource {
    /// Path into the source record; absent for literals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Subfield code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subfield: Option<String>,
    /// Indicator position, `"1"` or `"2"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    /// Value transform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
}

impl DataSource {
    /// Source reading `path`
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            from: Some(path.into()),
            ..Self::default()
        }
    }

    /// Literal indicator source
    pub fn indicator_literal(position: char, value: char) -> Self {
        Self {
            indicator: Some(position.to_string()),
            translation: Some(Translation::constant(value.to_string())),
            ..Self::default()
        }
    }

    /// Set the subfield code
    pub fn with_subfield(mut self, code: char) -> Self {
        self.subfield = Some(code.to_string());
        self
    }

    /// Set the translation
    pub fn with_translation(mut self, translation: Translation) -> Self {
        self.translation = Some(translation);
        self
    }

    /// Returns true when the source has no path
    pub fn is_literal(&self) -> bool {
        self.from.as_deref().map_or(true, |p| p.trim().is_empty())
    }

    /// Subfield code as a char
    pub fn subfield_code(&self) -> Option<char> {
        self.subfield.as_deref().and_then(|s| s.chars().next())
    }

    /// Indicator position as 1 or 2
    pub fn indicator_position(&self) -> Option<u8> {
        match self.indicator.as_deref() {
            Some("1") => Some(1),
            Some("2") => Some(2),
            _ => None,
        }
    }

    /// Returns true for control field sources
    pub fn is_control(&self) -> bool {
        self.subfield.is_none() && self.indicator.is_none()
    }
}

/// Output rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Field id used to look up default rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tag, or [`LEADER`]
    pub field: String,
    /// Inputs
    pub data_sources: Vec<DataSource>,
    /// Supplemental fields resolved per record and handed to translations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Rule {
    /// Rule with no data sources
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            id: None,
            field: field.into(),
            data_sources: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Returns true for the leader rule
    pub fn is_leader(&self) -> bool {
        self.field == LEADER
    }

    /// Sort data sources by subfield
    ///
    /// Alphabetic codes come first in code order, then numeric codes, then
    /// sources without a subfield. The sort is stable.
    pub fn sort_data_sources(&mut self) {
        self.data_sources.sort_by(compare_by_subfield);
    }
}

fn subfield_rank(source: &DataSource) -> (u8, &str) {
    match source.subfield.as_deref() {
        None => (2, ""),
        Some(s) if s.chars().next().is_some_and(|c| c.is_ascii_digit()) => (1, s),
        Some(s) => (0, s),
    }
}

fn compare_by_subfield(a: &DataSource, b: &DataSource) -> Ordering {
    subfield_rank(a).cmp(&subfield_rank(b))
}

/// Immutable rule set of one job
pub type RuleSet = std::sync::Arc<Vec<Rule>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(code: &str) -> DataSource {
        DataSource {
            subfield: Some(code.to_string()),
            ..DataSource::default()
        }
    }

    #[test]
    fn test_sort_order() {
        let mut rule = Rule::new("900");
        rule.data_sources = vec![
            DataSource::indicator_literal('1', 'f'),
            sub("3"),
            sub("b"),
            DataSource::indicator_literal('2', 'f'),
            sub("a"),
            sub("1"),
        ];
        rule.sort_data_sources();
        let order: Vec<Option<&str>> = rule
            .data_sources
            .iter()
            .map(|d| d.subfield.as_deref())
            .collect();
        assert_eq!(
            order,
            vec![Some("a"), Some("b"), Some("1"), Some("3"), None, None]
        );
        // indicators keep their relative order
        assert_eq!(rule.data_sources[4].indicator.as_deref(), Some("1"));
        assert_eq!(rule.data_sources[5].indicator.as_deref(), Some("2"));
    }

    #[test]
    fn test_sort_independent_of_input_order() {
        let mut a = Rule::new("900");
        a.data_sources = vec![sub("z"), sub("2"), sub("a")];
        let mut b = Rule::new("900");
        b.data_sources = vec![sub("2"), sub("a"), sub("z")];
        a.sort_data_sources();
        b.sort_data_sources();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rule_json_shape() {
        let rule: Rule = serde_json::from_str(
            r#"{"field":"005","dataSources":[{"from":"$.instance.metadata.updatedDate",
                "translation":{"function":"set_transaction_datetime"}}]}"#,
        )
        .unwrap();
        assert_eq!(rule.field, "005");
        assert!(rule.data_sources[0].is_control());
        assert!(!rule.data_sources[0].is_literal());
    }

    #[test]
    fn test_indicator_literal() {
        let ds = DataSource::indicator_literal('2', '0');
        assert_eq!(ds.indicator_position(), Some(2));
        assert!(ds.is_literal());
        assert_eq!(
            ds.translation.unwrap().parameters.get("value").map(String::as_str),
            Some("0")
        );
    }
}
