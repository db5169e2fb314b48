//! Rule processor
//!
//! Walks a rule set against one source record and writes the output record.
//! Paths are parsed once when the processor is built; a processor is then
//! shared read-only by every mapping worker of a job.
//!
//! A data rule whose path sources all share the same multi-selecting prefix
//! (`$.items[*]`, `$.instance.notes[?(...)]`) is a repeatable group: the prefix
//! is evaluated once and every selected element becomes its own field. Any
//! other data rule produces at most one field, where a source yielding several
//! values repeats its subfield.

use super::path::JsonPath;
use super::value::{read_simple, read_strings, RuleValue, StringValue};
use crate::core::reference_data::ReferenceData;
use crate::core::rules::{DataSource, Rule};
use crate::core::translation::TranslationRegistry;
use crate::domain::{BibExportError, Result, TranslationError};
use crate::marc::record::BLANK;
use crate::marc::{DataField, MarcRecord};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A translation that failed for one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationFailure {
    /// Tag of the rule
    pub tag: String,
    /// Function name
    pub function: String,
    /// Raw input value
    pub value: String,
    /// Failure
    pub error: TranslationError,
}

#[derive(Debug)]
enum RuleKind {
    Leader,
    Control,
    Data,
    Repeatable {
        prefix: JsonPath,
        relative: Vec<Option<JsonPath>>,
    },
}

#[derive(Debug)]
struct CompiledRule {
    rule: Rule,
    kind: RuleKind,
    paths: Vec<Option<JsonPath>>,
    metadata: Vec<(String, JsonPath)>,
    has_path_subfields: bool,
}

impl CompiledRule {
    fn compile(rule: &Rule) -> Result<Self> {
        let paths = rule
            .data_sources
            .iter()
            .map(|source| match source.from.as_deref() {
                Some(from) if !source.is_literal() => JsonPath::parse(from).map(Some),
                _ => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;

        let metadata = rule
            .metadata
            .iter()
            .map(|(name, from)| Ok((name.clone(), JsonPath::parse(from)?)))
            .collect::<Result<Vec<_>>>()?;

        let kind = if rule.is_leader() {
            RuleKind::Leader
        } else if rule.data_sources.iter().all(DataSource::is_control) {
            RuleKind::Control
        } else {
            repeatable_kind(&paths).unwrap_or(RuleKind::Data)
        };

        let has_path_subfields = rule
            .data_sources
            .iter()
            .zip(&paths)
            .any(|(source, path)| source.subfield.is_some() && path.is_some());

        if rule.field != crate::core::rules::LEADER && rule.field.chars().count() != 3 {
            return Err(BibExportError::Rule(format!(
                "Rule tag '{}' is not three characters",
                rule.field
            )));
        }

        Ok(Self {
            rule: rule.clone(),
            kind,
            paths,
            metadata,
            has_path_subfields,
        })
    }

    fn resolve_metadata(&self, record: &Value) -> BTreeMap<String, String> {
        self.metadata
            .iter()
            .filter_map(|(name, path)| {
                let value = read_strings(path, record).into_iter().next()?;
                Some((name.clone(), value))
            })
            .collect()
    }
}

fn repeatable_kind(paths: &[Option<JsonPath>]) -> Option<RuleKind> {
    let mut prefix: Option<JsonPath> = None;
    let mut relative = Vec::with_capacity(paths.len());
    for path in paths {
        match path {
            None => relative.push(None),
            Some(path) => {
                let (head, tail) = path.split_at_first_multi()?;
                match &prefix {
                    Some(existing) if *existing != head => return None,
                    Some(_) => {}
                    None => prefix = Some(head),
                }
                relative.push(Some(tail));
            }
        }
    }
    prefix.map(|prefix| RuleKind::Repeatable { prefix, relative })
}

/// Interprets one job's rule set
pub struct RuleProcessor {
    rules: Vec<CompiledRule>,
    registry: Arc<TranslationRegistry>,
}

impl RuleProcessor {
    /// Compile `rules`
    ///
    /// # Errors
    ///
    /// Returns [`BibExportError::Rule`] for malformed paths or tags.
    pub fn new(rules: &[Rule], registry: Arc<TranslationRegistry>) -> Result<Self> {
        let rules = rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules, registry })
    }

    /// Number of rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Map `record` into a new output record
    pub fn process(
        &self,
        record: &Value,
        reference_data: &ReferenceData,
        report: &mut dyn FnMut(TranslationFailure),
    ) -> MarcRecord {
        self.process_onto(MarcRecord::new(), record, reference_data, report)
    }

    /// Map `record`, appending to `base`
    pub fn process_onto(
        &self,
        mut base: MarcRecord,
        record: &Value,
        reference_data: &ReferenceData,
        report: &mut dyn FnMut(TranslationFailure),
    ) -> MarcRecord {
        for compiled in &self.rules {
            let mut pass = RulePass {
                registry: &self.registry,
                compiled,
                reference_data,
                metadata: compiled.resolve_metadata(record),
                report: &mut *report,
            };
            pass.apply(record, &mut base);
        }
        base
    }
}

struct RulePass<'a> {
    registry: &'a TranslationRegistry,
    compiled: &'a CompiledRule,
    reference_data: &'a ReferenceData,
    metadata: BTreeMap<String, String>,
    report: &'a mut dyn FnMut(TranslationFailure),
}

impl RulePass<'_> {
    fn apply(&mut self, record: &Value, output: &mut MarcRecord) {
        let compiled = self.compiled;
        match &compiled.kind {
            RuleKind::Leader => self.apply_leader(record, output),
            RuleKind::Control => self.apply_control(record, output),
            RuleKind::Data => {
                let values = self.read_sources(record);
                if let Some(field) = self.build_data_field(&values) {
                    output.add_data_field(field);
                }
            }
            RuleKind::Repeatable { prefix, relative } => {
                if let RuleValue::Composite(groups) = read_groups(prefix, relative, record) {
                    for group in groups {
                        let values = self.group_sources(&group);
                        if let Some(field) = self.build_data_field(&values) {
                            output.add_data_field(field);
                        }
                    }
                }
            }
        }
    }

    fn rule(&self) -> &Rule {
        &self.compiled.rule
    }

    /// Raw value of one source against the whole record
    fn read_source(&self, index: usize, record: &Value) -> RuleValue {
        match &self.compiled.paths[index] {
            None => RuleValue::Single(String::new()),
            Some(path) => read_simple(path, record),
        }
    }

    fn read_sources(&self, record: &Value) -> Vec<RuleValue> {
        (0..self.rule().data_sources.len())
            .map(|i| self.read_source(i, record))
            .collect()
    }

    fn group_sources(&self, group: &[StringValue]) -> Vec<RuleValue> {
        let mut per_source: Vec<Vec<String>> = vec![Vec::new(); self.rule().data_sources.len()];
        for value in group {
            if let Some(slot) = per_source.get_mut(value.source) {
                slot.push(value.value.clone());
            }
        }
        per_source
            .into_iter()
            .map(|mut values| match values.len() {
                0 => RuleValue::Missing,
                1 => values.pop().map_or(RuleValue::Missing, RuleValue::Single),
                _ => RuleValue::List(values),
            })
            .collect()
    }

    fn translate(&mut self, source: &DataSource, raw: &str) -> Option<String> {
        let Some(translation) = &source.translation else {
            return Some(raw.to_string());
        };
        match self
            .registry
            .apply(translation, raw, self.reference_data, &self.metadata)
        {
            Ok(value) => Some(value),
            Err(error) => {
                (self.report)(TranslationFailure {
                    tag: self.compiled.rule.field.clone(),
                    function: translation.function.clone(),
                    value: raw.to_string(),
                    error,
                });
                None
            }
        }
    }

    fn apply_leader(&mut self, record: &Value, output: &mut MarcRecord) {
        let compiled = self.compiled;
        for (index, source) in compiled.rule.data_sources.iter().enumerate() {
            let raw = self.read_source(index, record);
            let Some(raw) = raw.strings().first().map(|s| s.to_string()) else {
                continue;
            };
            if let Some(leader) = self.translate(source, &raw).filter(|l| !l.is_empty()) {
                output.set_leader(leader);
            }
        }
    }

    fn apply_control(&mut self, record: &Value, output: &mut MarcRecord) {
        let compiled = self.compiled;
        for (index, source) in compiled.rule.data_sources.iter().enumerate() {
            let raw = self.read_source(index, record);
            let Some(raw) = raw.strings().first().map(|s| s.to_string()) else {
                continue;
            };
            if let Some(value) = self.translate(source, &raw).filter(|v| !v.is_empty()) {
                output.add_control_field(compiled.rule.field.clone(), value);
                return;
            }
        }
    }

    /// One data field from per-source values, or `None` when no path fed it
    fn build_data_field(&mut self, values: &[RuleValue]) -> Option<DataField> {
        let compiled = self.compiled;
        let mut field = DataField::new(compiled.rule.field.clone(), BLANK, BLANK);
        let mut fed_by_path = false;

        for (index, (source, value)) in compiled.rule.data_sources.iter().zip(values).enumerate() {
            let from_path = compiled.paths[index].is_some();
            for raw in value.strings() {
                let Some(translated) = self.translate(source, raw) else {
                    continue;
                };
                if let Some(position) = source.indicator_position() {
                    let indicator = translated.chars().next().unwrap_or(BLANK);
                    match position {
                        1 => field.ind1 = indicator,
                        _ => field.ind2 = indicator,
                    }
                    break;
                }
                if let Some(code) = source.subfield_code() {
                    if translated.is_empty() {
                        continue;
                    }
                    fed_by_path |= from_path;
                    field.add_subfield(code, translated);
                }
            }
        }

        let keep = if compiled.has_path_subfields {
            fed_by_path
        } else {
            !field.subfields.is_empty()
        };
        keep.then_some(field)
    }
}

/// Read a repeatable group: one inner list per element selected by `prefix`
fn read_groups(prefix: &JsonPath, relative: &[Option<JsonPath>], record: &Value) -> RuleValue {
    let elements = prefix.select(record);
    if elements.is_empty() {
        return RuleValue::Missing;
    }
    let groups = elements
        .into_iter()
        .map(|element| {
            let mut group = Vec::new();
            for (index, path) in relative.iter().enumerate() {
                match path {
                    None => group.push(StringValue::new(index, "")),
                    Some(path) => group.extend(
                        read_strings(path, element)
                            .into_iter()
                            .map(|value| StringValue::new(index, value)),
                    ),
                }
            }
            group
        })
        .collect();
    RuleValue::Composite(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reference_data::entity;
    use crate::core::rules::{DataSource, Translation};
    use serde_json::json;

    fn processor(rules: Vec<Rule>) -> RuleProcessor {
        RuleProcessor::new(&rules, Arc::new(TranslationRegistry::new())).unwrap()
    }

    fn rule(field: &str, sources: Vec<DataSource>) -> Rule {
        let mut rule = Rule::new(field);
        rule.data_sources = sources;
        rule
    }

    fn run(processor: &RuleProcessor, record: &Value) -> (MarcRecord, Vec<TranslationFailure>) {
        let mut failures = Vec::new();
        let out = processor.process(record, &ReferenceData::new(), &mut |f| failures.push(f));
        (out, failures)
    }

    #[test]
    fn test_leader_and_control_fields() {
        let p = processor(vec![
            rule(
                "leader",
                vec![DataSource::default().with_translation(Translation::constant(
                    "00000cam a2200000 a 4500",
                ))],
            ),
            rule("001", vec![DataSource::from_path("$.instance.hrid")]),
            rule("003", vec![DataSource::from_path("$.instance.source")]),
        ]);
        let (out, failures) = run(&p, &json!({"instance": {"hrid": "in001"}}));
        assert!(failures.is_empty());
        assert_eq!(out.leader, "00000cam a2200000 a 4500");
        assert_eq!(out.control_field("001"), Some("in001"));
        assert_eq!(out.control_field("003"), None);
    }

    #[test]
    fn test_repeatable_group_fans_out() {
        let p = processor(vec![rule(
            "876",
            vec![
                DataSource::from_path("$.items[*].id").with_subfield('a'),
                DataSource::from_path("$.items[*].barcode").with_subfield('p'),
                DataSource::indicator_literal('1', ' '),
                DataSource::indicator_literal('2', ' '),
            ],
        )]);
        let record = json!({"items": [
            {"id": "i1", "barcode": "b1"},
            {"id": "i2"},
            {"id": "i3", "barcode": "b3"}
        ]});
        let (out, _) = run(&p, &record);
        let fields: Vec<&DataField> = out.data_fields("876").collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].subfield('a'), Some("i1"));
        assert_eq!(fields[0].subfield('p'), Some("b1"));
        assert_eq!(fields[1].subfields.len(), 1);
        assert_eq!(fields[2].subfield('p'), Some("b3"));
    }

    #[test]
    fn test_non_repeatable_list_repeats_subfield() {
        let p = processor(vec![rule(
            "490",
            vec![
                DataSource::from_path("$.title").with_subfield('a'),
                DataSource::from_path("$.series[*]").with_subfield('v'),
            ],
        )]);
        let (out, _) = run(&p, &json!({"title": "T", "series": ["s1", "s2"]}));
        let fields: Vec<&DataField> = out.data_fields("490").collect();
        assert_eq!(fields.len(), 1);
        let codes: Vec<char> = fields[0].subfields.iter().map(|s| s.code).collect();
        assert_eq!(codes, vec!['a', 'v', 'v']);
    }

    #[test]
    fn test_literal_subfield_alone_does_not_emit() {
        let p = processor(vec![rule(
            "336",
            vec![
                DataSource::from_path("$.instanceTypeId").with_subfield('a'),
                DataSource::default()
                    .with_subfield('2')
                    .with_translation(Translation::constant("rdacontent")),
            ],
        )]);
        let (out, _) = run(&p, &json!({}));
        assert!(out.is_empty());
    }

    #[test]
    fn test_translation_failure_is_reported_and_value_omitted() {
        let p = processor(vec![rule(
            "876",
            vec![
                DataSource::from_path("$.materialTypeId")
                    .with_subfield('3')
                    .with_translation(Translation::new("set_material_type")),
                DataSource::from_path("$.barcode").with_subfield('p'),
            ],
        )]);
        let (out, failures) = run(&p, &json!({"materialTypeId": "missing", "barcode": "b"}));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].function, "set_material_type");
        assert_eq!(
            failures[0].error,
            TranslationError::ReferenceNotFound {
                entity: entity::MATERIAL_TYPES.into(),
                id: "missing".into()
            }
        );
        let field = out.data_fields("876").next().unwrap();
        assert_eq!(field.subfield('3'), None);
        assert_eq!(field.subfield('p'), Some("b"));
    }

    #[test]
    fn test_indicator_from_path() {
        let p = processor(vec![rule(
            "856",
            vec![
                DataSource::from_path("$.links[*].uri").with_subfield('u'),
                DataSource::indicator_literal('1', '4'),
                DataSource {
                    from: Some("$.links[*].kind".into()),
                    indicator: Some("2".into()),
                    ..DataSource::default()
                },
            ],
        )]);
        let record = json!({"links": [{"uri": "http://a", "kind": "1"}, {"uri": "http://b"}]});
        let (out, _) = run(&p, &record);
        let fields: Vec<&DataField> = out.data_fields("856").collect();
        assert_eq!((fields[0].ind1, fields[0].ind2), ('4', '1'));
        assert_eq!((fields[1].ind1, fields[1].ind2), ('4', ' '));
    }

    #[test]
    fn test_metadata_reaches_translation() {
        let mut fixed = rule(
            "008",
            vec![DataSource::from_path("$.created")
                .with_translation(Translation::new("set_fixed_length_data_elements"))],
        );
        fixed
            .metadata
            .insert("language".into(), "$.languages[0]".into());
        let p = processor(vec![fixed]);
        let (out, failures) = run(&p, &json!({"created": "2021-01-02", "languages": ["fre"]}));
        assert!(failures.is_empty());
        let value = out.control_field("008").unwrap();
        assert_eq!(&value[35..38], "fre");
    }

    #[test]
    fn test_process_onto_keeps_base_fields() {
        let mut base = MarcRecord::new();
        base.add_control_field("001", "srs");
        let p = processor(vec![rule(
            "852",
            vec![DataSource::from_path("$.holdings[0].callNumber").with_subfield('h')],
        )]);
        let out = p.process_onto(
            base,
            &json!({"holdings": [{"callNumber": "QA76"}]}),
            &ReferenceData::new(),
            &mut |_| {},
        );
        assert_eq!(out.control_field("001"), Some("srs"));
        assert_eq!(out.data_fields("852").next().unwrap().subfield('h'), Some("QA76"));
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let bad_path = rule("245", vec![DataSource::from_path("$.a[").with_subfield('a')]);
        assert!(RuleProcessor::new(&[bad_path], Arc::new(TranslationRegistry::new())).is_err());

        let bad_tag = rule("24", vec![DataSource::from_path("$.a").with_subfield('a')]);
        assert!(RuleProcessor::new(&[bad_tag], Arc::new(TranslationRegistry::new())).is_err());
    }
}
