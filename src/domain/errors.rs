//! Domain error types
//!
//! This module defines the error hierarchy for bibexport.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main bibexport error type
///
/// This is the primary error type used throughout the application.
/// It wraps the narrower engine errors and provides context for error handling.
#[derive(Debug, Error)]
pub enum BibExportError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Catalog collaborator errors (record and reference data fetches)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Output storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Job, profile or error-log persistence errors
    #[error("Repository error: {0}")]
    Repository(String),

    /// Identifier source errors
    #[error("Source reader error: {0}")]
    SourceReader(String),

    /// Record mapping errors
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Translation function errors
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Rule set construction errors
    #[error("Rule error: {0}")]
    Rule(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Translation function errors
///
/// Raised by a single translation call. The rule processor catches these at
/// single-value granularity, so they never fail a whole record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslationError {
    /// The named function is not registered
    #[error("Unknown translation function: {0}")]
    UnknownFunction(String),

    /// A required parameter is absent
    #[error("Missing parameter '{parameter}' for function {function}")]
    MissingParameter {
        /// Function name
        function: String,
        /// Parameter name
        parameter: String,
    },

    /// The id was not found in the reference data table
    #[error("No {entity} entry with id '{id}'")]
    ReferenceNotFound {
        /// Reference data entity type
        entity: String,
        /// Looked-up id
        id: String,
    },

    /// A date value could not be parsed
    #[error("Invalid date value: {0}")]
    InvalidDate(String),
}

/// Record mapping errors
///
/// Raised for one record inside the mapping service. The service catches
/// these at single-record granularity and drops the record from its chunk.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    /// The source record has an unexpected shape
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// A stored MARC record could not be read
    #[error("Invalid MARC record: {0}")]
    InvalidMarc(String),

    /// The output record could not be encoded
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// The mapping worker panicked
    #[error("Mapping worker panicked: {0}")]
    Panicked(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for BibExportError {
    fn from(err: std::io::Error) -> Self {
        BibExportError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for BibExportError {
    fn from(err: serde_json::Error) -> Self {
        BibExportError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for BibExportError {
    fn from(err: toml::de::Error) -> Self {
        BibExportError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BibExportError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_translation_error_conversion() {
        let err = TranslationError::UnknownFunction("set_nothing".to_string());
        let converted: BibExportError = err.into();
        assert!(matches!(converted, BibExportError::Translation(_)));
        assert!(converted.to_string().contains("set_nothing"));
    }

    #[test]
    fn test_mapping_error_conversion() {
        let err = MappingError::MalformedRecord("not an object".to_string());
        let converted: BibExportError = err.into();
        assert!(matches!(converted, BibExportError::Mapping(_)));
    }

    #[test]
    fn test_reference_not_found_display() {
        let err = TranslationError::ReferenceNotFound {
            entity: "materialTypes".to_string(),
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "No materialTypes entry with id 'abc'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: BibExportError = io_err.into();
        assert!(matches!(err, BibExportError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: BibExportError = json_err.into();
        assert!(matches!(err, BibExportError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: BibExportError = toml_err.into();
        assert!(matches!(err, BibExportError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }
}
