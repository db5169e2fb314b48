//! Rule set construction
//!
//! Builds the ordered rule set of one job from the bundled defaults and the
//! job's mapping profile transformations.

use super::defaults::DefaultRules;
use super::model::{DataSource, Rule, Translation};
use crate::domain::{MappingProfile, RecordType, Transformation};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Dot-split position of the key segment in composite field ids,
/// e.g. `uri` in `instance.electronic.access.uri.resource`
const KEY_SEGMENT: usize = 3;

const PERMANENT_LOCATION: &str = "permanentlocation";
const TEMPORARY_LOCATION: &str = "temporarylocation";
const EFFECTIVE_LOCATION: &str = "effectivelocation";

/// Field id fragment to translation function, checked in order
const FIELD_TRANSLATIONS: &[(&str, &str)] = &[
    ("materialtypeid", "set_material_type"),
    ("loantype", "set_loan_type"),
    ("instancetypeid", "set_instance_type_id"),
    ("instanceformatids", "set_instance_format_id"),
    ("metadata.createddate", "set_transaction_datetime"),
    ("metadata.updateddate", "set_transaction_datetime"),
    ("callnumbertype", "set_call_number_type_id"),
];

/// Output spec of one transformation, e.g. `90011$a`
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedSpec {
    tag: String,
    indicators: Option<(char, char)>,
    subfield: Option<char>,
}

fn parse_spec(spec: &str) -> Option<ParsedSpec> {
    let chars: Vec<char> = spec.chars().collect();
    if chars.len() < 3 {
        return None;
    }
    let tag: String = chars[..3].iter().collect();
    let indicators = if chars.len() >= 5 && chars[3] != '$' && chars[4] != '$' {
        Some((normalize_indicator(chars[3]), normalize_indicator(chars[4])))
    } else {
        None
    };
    let subfield = spec
        .find('$')
        .and_then(|i| spec[i + 1..].chars().next());
    Some(ParsedSpec {
        tag,
        indicators,
        subfield,
    })
}

fn normalize_indicator(c: char) -> char {
    if c == '\\' || c == '_' {
        ' '
    } else {
        c
    }
}

/// Rule factory
///
/// Holds the default rules by reference; building is pure and cheap enough to
/// run once per job.
#[derive(Debug, Clone)]
pub struct RuleFactory {
    defaults: Arc<DefaultRules>,
}

impl RuleFactory {
    /// Create a factory over the loaded defaults
    pub fn new(defaults: Arc<DefaultRules>) -> Self {
        Self { defaults }
    }

    /// Rules for generating records of `record_type` from source JSON
    ///
    /// A profile without transformations uses the defaults unmodified. A
    /// default profile with transformations gets its custom rules first, then
    /// every default rule whose tag the custom rules do not cover.
    pub fn create(&self, profile: &MappingProfile, record_type: RecordType) -> Vec<Rule> {
        let defaults = self.defaults.for_record_type(record_type);
        if profile.transformations.is_empty() {
            return defaults.to_vec();
        }

        let mut rules = self.build(profile, |_| true);
        if profile.default {
            let covered: HashSet<String> = rules.iter().map(|r| r.field.clone()).collect();
            rules.extend(
                defaults
                    .iter()
                    .filter(|r| !covered.contains(&r.field))
                    .cloned(),
            );
        }
        debug!(
            profile_id = %profile.id,
            record_type = %record_type,
            rules = rules.len(),
            "Built rule set"
        );
        rules
    }

    /// Rules applied on top of a stored MARC record
    ///
    /// Only holdings and item transformations contribute; the stored record
    /// already carries the bibliographic fields.
    pub fn create_for_stored_record(&self, profile: &MappingProfile) -> Vec<Rule> {
        self.build(profile, |t| {
            matches!(t.record_type, RecordType::Holdings | RecordType::Item)
        })
    }

    fn build<F>(&self, profile: &MappingProfile, include: F) -> Vec<Rule>
    where
        F: Fn(&Transformation) -> bool,
    {
        let temporary_location_specs: HashSet<&str> = profile
            .transformations
            .iter()
            .filter(|t| {
                t.field_id
                    .to_lowercase()
                    .starts_with(&format!("holdings.{TEMPORARY_LOCATION}"))
            })
            .map(|t| t.transformation.trim())
            .filter(|s| !s.is_empty())
            .collect();

        let mut rules: IndexMap<String, Rule> = IndexMap::new();
        for transformation in profile.transformations.iter().filter(|t| include(t)) {
            if !transformation.enabled {
                continue;
            }

            if !transformation.has_blank_spec() {
                if is_duplicate_location(transformation, &temporary_location_specs) {
                    debug!(
                        field_id = %transformation.field_id,
                        "Skipping permanent location that duplicates temporary location spec"
                    );
                    continue;
                }
                add_spec_rule(&mut rules, transformation);
            } else if transformation.record_type == RecordType::Instance {
                match self.default_rule_for(transformation) {
                    Some(rule) => {
                        rules.insert(format!("default:{}", transformation.field_id), rule);
                    }
                    None => warn!(
                        field_id = %transformation.field_id,
                        "No default rule for instance transformation with empty spec"
                    ),
                }
            } else {
                warn!(
                    field_id = %transformation.field_id,
                    record_type = %transformation.record_type,
                    "Transformation has an empty spec, no rule built"
                );
            }
        }

        rules
            .into_values()
            .map(|mut rule| {
                rule.sort_data_sources();
                rule
            })
            .collect()
    }

    /// Resolve the default rule of a blank-spec instance transformation
    fn default_rule_for(&self, transformation: &Transformation) -> Option<Rule> {
        if let Some(rule) = self.defaults.find_instance_rule(&transformation.field_id) {
            return Some(rule.clone());
        }

        let segments: Vec<&str> = transformation.field_id.split('.').collect();
        let key = segments.get(KEY_SEGMENT)?.to_lowercase();
        let parent_id = segments
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != KEY_SEGMENT)
            .map(|(_, s)| *s)
            .collect::<Vec<_>>()
            .join(".");
        let parent = self.defaults.find_instance_rule(&parent_id)?;
        let source = parent.data_sources.iter().find(|ds| {
            ds.from
                .as_deref()
                .is_some_and(|from| from.to_lowercase().contains(&key))
        })?;

        let mut rule = Rule::new(parent.field.clone());
        rule.id = Some(transformation.field_id.clone());
        rule.data_sources.push(DataSource {
            from: Some(transformation.path.clone()),
            subfield: source.subfield.clone(),
            ..DataSource::default()
        });
        rule.data_sources.extend(
            parent
                .data_sources
                .iter()
                .filter(|ds| ds.indicator.is_some())
                .cloned(),
        );
        Some(rule)
    }
}

fn is_duplicate_location(transformation: &Transformation, temporary_specs: &HashSet<&str>) -> bool {
    transformation
        .field_id
        .to_lowercase()
        .starts_with(&format!("holdings.{PERMANENT_LOCATION}"))
        && temporary_specs.contains(transformation.transformation.trim())
}

fn add_spec_rule(rules: &mut IndexMap<String, Rule>, transformation: &Transformation) {
    let Some(spec) = parse_spec(transformation.transformation.trim()) else {
        warn!(
            field_id = %transformation.field_id,
            spec = %transformation.transformation,
            "Transformation spec is shorter than a tag, no rule built"
        );
        return;
    };

    let mut source = DataSource::from_path(transformation.path.clone());
    source.subfield = spec.subfield.map(|c| c.to_string());
    source.translation = translation_for(transformation);

    match rules.get_mut(&spec.tag) {
        Some(rule) => rule.data_sources.push(source),
        None => {
            let mut rule = Rule::new(spec.tag.clone());
            rule.data_sources.push(source);
            if let Some((ind1, ind2)) = spec.indicators {
                rule.data_sources.push(DataSource::indicator_literal('1', ind1));
                rule.data_sources.push(DataSource::indicator_literal('2', ind2));
            }
            rules.insert(spec.tag, rule);
        }
    }
}

/// Pick the translation for a transformation from its field id
fn translation_for(transformation: &Transformation) -> Option<Translation> {
    let field_id = transformation.field_id.to_lowercase();

    let mut translation = if let Some(function) = location_function(&field_id) {
        Some(Translation::new(function).with_parameter("field", location_field(&field_id)))
    } else {
        FIELD_TRANSLATIONS
            .iter()
            .find(|(fragment, _)| field_id.contains(fragment))
            .map(|(_, function)| Translation::new(*function))
    }?;

    for (key, value) in &transformation.metadata_parameters {
        translation.parameters.insert(key.clone(), value.clone());
    }
    Some(translation)
}

fn location_function(field_id: &str) -> Option<&'static str> {
    if field_id.contains(TEMPORARY_LOCATION) {
        Some("set_temporary_location")
    } else if field_id.contains(PERMANENT_LOCATION) {
        Some("set_permanent_location")
    } else if field_id.contains(EFFECTIVE_LOCATION) {
        Some("set_effective_location")
    } else {
        None
    }
}

/// Attribute requested after the location segment
///
/// `holdings.permanentlocation.library.name` asks for `libraryName`,
/// `holdings.permanentlocation.code` for `code`, a bare location for `name`.
fn location_field(field_id: &str) -> String {
    let segments: Vec<&str> = field_id.split('.').collect();
    let tail: Vec<&str> = segments
        .iter()
        .position(|s| s.ends_with("location"))
        .map(|i| segments[i + 1..].to_vec())
        .unwrap_or_default();

    match tail.as_slice() {
        [] => "name".to_string(),
        [attribute] => (*attribute).to_string(),
        [entity, attribute, ..] => {
            let mut chars = attribute.chars();
            let capitalized: String = chars
                .next()
                .map(|c| c.to_uppercase().chain(chars).collect())
                .unwrap_or_default();
            format!("{entity}{capitalized}")
        }
    }
}
