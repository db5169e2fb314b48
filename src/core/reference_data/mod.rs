//! Reference data
//!
//! Lookup tables (locations, material types, instance types, ...) keyed by
//! entity type and then by id. Loaded once per job and read-only afterwards.

pub mod cache;

pub use cache::ReferenceDataCache;

use serde_json::Value;
use std::collections::HashMap;

/// Entity types loaded for every job
pub const ENTITY_TYPES: &[&str] = &[
    entity::INSTANCE_TYPES,
    entity::INSTANCE_FORMATS,
    entity::MATERIAL_TYPES,
    entity::LOAN_TYPES,
    entity::CALL_NUMBER_TYPES,
    entity::LOCATIONS,
    entity::LIBRARIES,
    entity::CAMPUSES,
    entity::INSTITUTIONS,
    entity::ELECTRONIC_ACCESS_RELATIONSHIPS,
    entity::CONTRIBUTOR_NAME_TYPES,
    entity::IDENTIFIER_TYPES,
];

/// Entity type names
pub mod entity {
    /// Instance resource types
    pub const INSTANCE_TYPES: &str = "instanceTypes";
    /// Instance carrier formats
    pub const INSTANCE_FORMATS: &str = "instanceFormats";
    /// Item material types
    pub const MATERIAL_TYPES: &str = "materialTypes";
    /// Loan types
    pub const LOAN_TYPES: &str = "loantypes";
    /// Call number types
    pub const CALL_NUMBER_TYPES: &str = "callNumberTypes";
    /// Shelving locations
    pub const LOCATIONS: &str = "locations";
    /// Location libraries
    pub const LIBRARIES: &str = "loclibs";
    /// Location campuses
    pub const CAMPUSES: &str = "loccamps";
    /// Location institutions
    pub const INSTITUTIONS: &str = "locinsts";
    /// Electronic access relationships
    pub const ELECTRONIC_ACCESS_RELATIONSHIPS: &str = "electronicAccessRelationships";
    /// Contributor name types
    pub const CONTRIBUTOR_NAME_TYPES: &str = "contributorNameTypes";
    /// Identifier types
    pub const IDENTIFIER_TYPES: &str = "identifierTypes";
}

/// Reference data aggregate of one job
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    tables: HashMap<String, HashMap<String, Value>>,
}

impl ReferenceData {
    /// Empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entity table; entries without a string `id` are skipped
    pub fn insert_table(&mut self, entity: impl Into<String>, entries: Vec<Value>) {
        let table = entries
            .into_iter()
            .filter_map(|entry| {
                let id = entry.get("id")?.as_str()?.to_string();
                Some((id, entry))
            })
            .collect();
        self.tables.insert(entity.into(), table);
    }

    /// Builder-style [`ReferenceData::insert_table`]
    pub fn with_table(mut self, entity: impl Into<String>, entries: Vec<Value>) -> Self {
        self.insert_table(entity, entries);
        self
    }

    /// Entry by entity type and id
    pub fn get(&self, entity: &str, id: &str) -> Option<&Value> {
        self.tables.get(entity)?.get(id)
    }

    /// String attribute of an entry
    pub fn attribute(&self, entity: &str, id: &str, attribute: &str) -> Option<&str> {
        self.get(entity, id)?.get(attribute)?.as_str()
    }

    /// Number of entries of an entity type
    pub fn len_of(&self, entity: &str) -> usize {
        self.tables.get(entity).map_or(0, HashMap::len)
    }
}
