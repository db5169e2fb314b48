//! Mapping profile model
//!
//! Profiles are owned by profile management. A job reads its profile once and
//! never writes it back.

use super::ids::ProfileId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Catalog record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    /// Bibliographic instance
    Instance,
    /// Holdings record
    Holdings,
    /// Item record
    Item,
    /// Authority record
    Authority,
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordType::Instance => "INSTANCE",
            RecordType::Holdings => "HOLDINGS",
            RecordType::Item => "ITEM",
            RecordType::Authority => "AUTHORITY",
        };
        f.write_str(s)
    }
}

/// Output serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputFormat {
    /// ISO 2709 binary MARC
    #[default]
    Marc,
    /// MARC-in-JSON, one record per line
    Json,
}

impl OutputFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Marc => "mrc",
            OutputFormat::Json => "json",
        }
    }
}

/// One user-configured field mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    /// Dot separated field id, e.g. `holdings.callnumber` or
    /// `instance.electronic.access.uri.related.resource`
    pub field_id: String,
    /// Path into the source record
    pub path: String,
    /// Output spec: tag, optional indicators, optional `$<code>`
    #[serde(default)]
    pub transformation: String,
    /// Record type the field belongs to
    pub record_type: RecordType,
    /// Disabled transformations are ignored
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Extra parameters passed to the translation function
    #[serde(default)]
    pub metadata_parameters: BTreeMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

impl Transformation {
    /// Returns true when the output spec is blank
    pub fn has_blank_spec(&self) -> bool {
        self.transformation.trim().is_empty()
    }
}

/// Id of the built-in default instance profile
pub const DEFAULT_INSTANCE_PROFILE_ID: &str = "25d81cbe-9686-11ea-bb37-0242ac130002";

/// Mapping profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingProfile {
    /// Profile id
    pub id: ProfileId,
    /// Display name
    pub name: String,
    /// Record types to include in the output
    pub record_types: Vec<RecordType>,
    /// Custom field mappings
    #[serde(default)]
    pub transformations: Vec<Transformation>,
    /// Tags dropped from the output
    #[serde(default)]
    pub suppression: Vec<String>,
    /// Output serialization
    #[serde(default)]
    pub output_format: OutputFormat,
    /// The system default profile
    #[serde(default)]
    pub default: bool,
}

impl MappingProfile {
    /// The built-in default instance profile
    pub fn default_instance() -> Self {
        Self {
            id: ProfileId::from_trusted(DEFAULT_INSTANCE_PROFILE_ID),
            name: "Default instance mapping profile".to_string(),
            record_types: vec![RecordType::Instance],
            transformations: Vec::new(),
            suppression: Vec::new(),
            output_format: OutputFormat::Marc,
            default: true,
        }
    }

    /// Returns true when the profile includes the record type
    pub fn has_record_type(&self, record_type: RecordType) -> bool {
        self.record_types.contains(&record_type)
    }

    /// Enabled transformations for one record type
    pub fn transformations_for(
        &self,
        record_type: RecordType,
    ) -> impl Iterator<Item = &Transformation> {
        self.transformations
            .iter()
            .filter(move |t| t.enabled && t.record_type == record_type)
    }

    /// Suppressed tags as a set
    pub fn suppressed_tags(&self) -> HashSet<String> {
        self.suppression
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Split a comma separated suppression string into tags
pub fn parse_suppression(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
