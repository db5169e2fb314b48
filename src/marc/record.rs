//! Output record model
//!
//! A [`MarcRecord`] is a leader plus an ordered list of fields. Control fields
//! (tags `001`..`009`) carry one raw value; data fields carry two indicators and
//! an ordered list of subfields.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Leader used when no leader rule fires
pub const DEFAULT_LEADER: &str = "00000nam a2200000 a 4500";

/// Blank indicator
pub const BLANK: char = ' ';

/// Returns true for control field tags (`001`..`009`)
pub fn is_control_tag(tag: &str) -> bool {
    tag.len() == 3 && tag.starts_with("00")
}

/// One subfield of a data field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code
    pub code: char,
    /// Subfield value
    pub value: String,
}

impl Subfield {
    /// Create a subfield
    pub fn new(code: char, value: impl Into<String>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }
}

/// Control field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlField {
    /// Tag
    pub tag: String,
    /// Raw value
    pub value: String,
}

/// Data field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    /// Tag
    pub tag: String,
    /// First indicator
    pub ind1: char,
    /// Second indicator
    pub ind2: char,
    /// Subfields in output order
    pub subfields: Vec<Subfield>,
}

impl DataField {
    /// Create a data field with no subfields
    pub fn new(tag: impl Into<String>, ind1: char, ind2: char) -> Self {
        Self {
            tag: tag.into(),
            ind1,
            ind2,
            subfields: Vec::new(),
        }
    }

    /// Append a subfield
    pub fn add_subfield(&mut self, code: char, value: impl Into<String>) {
        self.subfields.push(Subfield::new(code, value));
    }

    /// Builder-style [`DataField::add_subfield`]
    pub fn with_subfield(mut self, code: char, value: impl Into<String>) -> Self {
        self.add_subfield(code, value);
        self
    }

    /// First value of a subfield code
    pub fn subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|s| s.code == code)
            .map(|s| s.value.as_str())
    }
}

/// A field of either kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarcField {
    /// Control field
    Control(ControlField),
    /// Data field
    Data(DataField),
}

impl MarcField {
    /// Tag of the field
    pub fn tag(&self) -> &str {
        match self {
            MarcField::Control(f) => &f.tag,
            MarcField::Data(f) => &f.tag,
        }
    }
}

/// Output record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarcRecord {
    /// 24 character leader
    pub leader: String,
    /// Fields in output order
    pub fields: Vec<MarcField>,
}

impl Default for MarcRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl MarcRecord {
    /// Create an empty record with the default leader
    pub fn new() -> Self {
        Self {
            leader: DEFAULT_LEADER.to_string(),
            fields: Vec::new(),
        }
    }

    /// Replace the leader
    pub fn set_leader(&mut self, leader: impl Into<String>) {
        self.leader = leader.into();
    }

    /// Append a control field
    pub fn add_control_field(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.fields.push(MarcField::Control(ControlField {
            tag: tag.into(),
            value: value.into(),
        }));
    }

    /// Append a data field
    pub fn add_data_field(&mut self, field: DataField) {
        self.fields.push(MarcField::Data(field));
    }

    /// First control field value with the tag
    pub fn control_field(&self, tag: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            MarcField::Control(c) if c.tag == tag => Some(c.value.as_str()),
            _ => None,
        })
    }

    /// All data fields with the tag
    pub fn data_fields<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DataField> + 'a {
        self.fields.iter().filter_map(move |f| match f {
            MarcField::Data(d) if d.tag == tag => Some(d),
            _ => None,
        })
    }

    /// Drop every field whose tag is in `tags`
    pub fn remove_tags(&mut self, tags: &HashSet<String>) {
        if tags.is_empty() {
            return;
        }
        self.fields.retain(|f| !tags.contains(f.tag()));
    }

    /// Stable sort by tag
    ///
    /// Fields sharing a tag keep their relative order.
    pub fn sort_fields(&mut self) {
        self.fields.sort_by(|a, b| a.tag().cmp(b.tag()));
    }

    /// Move all fields of `other` into this record
    pub fn extend(&mut self, other: MarcRecord) {
        self.fields.extend(other.fields);
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_tag_detection() {
        assert!(is_control_tag("001"));
        assert!(is_control_tag("008"));
        assert!(!is_control_tag("010"));
        assert!(!is_control_tag("245"));
        assert!(!is_control_tag("leader"));
    }

    #[test]
    fn test_sort_is_stable_within_tag() {
        let mut record = MarcRecord::new();
        record.add_data_field(DataField::new("900", BLANK, BLANK).with_subfield('a', "first"));
        record.add_control_field("001", "id");
        record.add_data_field(DataField::new("245", '1', '0').with_subfield('a', "Title"));
        record.add_data_field(DataField::new("900", BLANK, BLANK).with_subfield('a', "second"));
        record.sort_fields();

        let tags: Vec<&str> = record.fields.iter().map(|f| f.tag()).collect();
        assert_eq!(tags, vec!["001", "245", "900", "900"]);
        let values: Vec<&str> = record
            .data_fields("900")
            .filter_map(|f| f.subfield('a'))
            .collect();
        assert_eq!(values, vec!["first", "second"]);
    }

    #[test]
    fn test_remove_tags() {
        let mut record = MarcRecord::new();
        record.add_control_field("001", "id");
        record.add_data_field(DataField::new("999", 'f', 'f').with_subfield('i', "x"));
        let tags: HashSet<String> = ["999".to_string()].into_iter().collect();
        record.remove_tags(&tags);
        assert_eq!(record.len(), 1);
        assert_eq!(record.control_field("001"), Some("id"));
    }
}
