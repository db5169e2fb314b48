//! Catalog collaborator
//!
//! Source of instances, holdings, items, stored MARC records and reference
//! data. [`JsonCatalog`] serves JSON snapshot files.

pub mod json;
pub mod traits;

pub use json::JsonCatalog;
pub use traits::{CatalogClient, MarcRecordType};
