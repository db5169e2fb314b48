//! MARC output model and encodings
//!
//! - [`record`] - leader, control fields, data fields, subfields
//! - [`iso2709`] - binary exchange format
//! - [`json`] - MARC-in-JSON, also the layout of stored source records
//! - [`mnemonic`] - line oriented text rendering

pub mod iso2709;
pub mod json;
pub mod mnemonic;
pub mod record;

pub use record::{ControlField, DataField, MarcField, MarcRecord, Subfield};

use crate::domain::{MappingError, OutputFormat};

/// Encode one record as a line of output text
///
/// ISO 2709 output is UTF-8 with ASCII delimiters, so it is still valid text.
/// JSON output is one compact document per line.
pub fn encode(record: &MarcRecord, format: OutputFormat) -> Result<String, MappingError> {
    match format {
        OutputFormat::Marc => {
            let bytes = iso2709::write_record(record)?;
            String::from_utf8(bytes).map_err(|e| MappingError::Encoding(e.to_string()))
        }
        OutputFormat::Json => {
            let mut line = json::to_json(record).to_string();
            line.push('\n');
            Ok(line)
        }
    }
}
