//! Bundled default rule sets
//!
//! Loaded once at process start and injected into [`super::RuleFactory`] by
//! reference. Nothing here is lazily initialized behind a global.

use super::model::Rule;
use crate::domain::{BibExportError, RecordType, Result};

const INSTANCE_RULES: &str = include_str!("../../../resources/default_rules/instance.json");
const HOLDINGS_RULES: &str = include_str!("../../../resources/default_rules/holdings.json");

/// Default rules per record type
#[derive(Debug, Clone)]
pub struct DefaultRules {
    instance: Vec<Rule>,
    holdings: Vec<Rule>,
}

impl DefaultRules {
    /// Parse the bundled resources
    ///
    /// # Errors
    ///
    /// Returns [`BibExportError::Rule`] when a resource is not a JSON array of
    /// rules.
    pub fn load() -> Result<Self> {
        Self::from_json(INSTANCE_RULES, HOLDINGS_RULES)
    }

    /// Parse rule sets from JSON documents
    pub fn from_json(instance: &str, holdings: &str) -> Result<Self> {
        let instance: Vec<Rule> = serde_json::from_str(instance)
            .map_err(|e| BibExportError::Rule(format!("Invalid instance default rules: {e}")))?;
        let holdings: Vec<Rule> = serde_json::from_str(holdings)
            .map_err(|e| BibExportError::Rule(format!("Invalid holdings default rules: {e}")))?;
        Ok(Self { instance, holdings })
    }

    /// Default rules for an export of `record_type`
    ///
    /// Authority exports pass stored records through and have no defaults.
    pub fn for_record_type(&self, record_type: RecordType) -> &[Rule] {
        match record_type {
            RecordType::Instance => &self.instance,
            RecordType::Holdings | RecordType::Item => &self.holdings,
            RecordType::Authority => &[],
        }
    }

    /// Default instance rule with the given id
    pub fn find_instance_rule(&self, id: &str) -> Option<&Rule> {
        self.instance.iter().find(|r| r.id.as_deref() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_rules_parse() {
        let defaults = DefaultRules::load().unwrap();
        assert!(!defaults.for_record_type(RecordType::Instance).is_empty());
        assert!(!defaults.for_record_type(RecordType::Holdings).is_empty());
        assert!(defaults.for_record_type(RecordType::Authority).is_empty());
    }

    #[test]
    fn test_bundled_leaders_are_24_chars() {
        let defaults = DefaultRules::load().unwrap();
        for record_type in [RecordType::Instance, RecordType::Holdings] {
            let leader = defaults
                .for_record_type(record_type)
                .iter()
                .find(|r| r.is_leader())
                .unwrap();
            let value = &leader.data_sources[0]
                .translation
                .as_ref()
                .unwrap()
                .parameters["value"];
            assert_eq!(value.len(), 24, "{record_type} leader");
        }
    }

    #[test]
    fn test_find_instance_rule() {
        let defaults = DefaultRules::load().unwrap();
        let rule = defaults.find_instance_rule("instance.title").unwrap();
        assert_eq!(rule.field, "245");
        assert!(defaults.find_instance_rule("instance.nothing").is_none());
    }

    #[test]
    fn test_invalid_json_is_rule_error() {
        let err = DefaultRules::from_json("{", "[]").unwrap_err();
        assert!(matches!(err, BibExportError::Rule(_)));
    }
}
