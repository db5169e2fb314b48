//! Configuration schema types
//!
//! Every section has defaults, so an empty file is a valid configuration.

use crate::domain::{BibExportError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main bibexport configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BibExportConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Export job settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Reference data cache settings
    #[serde(default)]
    pub reference_data: ReferenceDataConfig,

    /// Catalog snapshot location
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Job and error log persistence
    #[serde(default)]
    pub state: StateConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BibExportConfig {
    /// Parse a TOML document without environment handling
    ///
    /// # Errors
    ///
    /// Returns [`BibExportError::Configuration`] on invalid TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Read and parse a TOML file without environment handling
    ///
    /// # Errors
    ///
    /// Returns [`BibExportError::Configuration`] when the file cannot be read
    /// or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BibExportError::Configuration(format!(
                "Failed to read configuration file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Render the configuration back to TOML
    ///
    /// # Errors
    ///
    /// Returns [`BibExportError::Serialization`] if a value cannot be encoded.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BibExportError::Serialization(e.to_string()))
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.application.validate()?;
        self.export.validate()?;
        self.reference_data.validate()?;
        self.catalog.validate()?;
        self.state.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Export job settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Identifiers per chunk
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Jobs running at the same time
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Mapping pool threads (0 = one per core)
    #[serde(default)]
    pub mapping_threads: usize,

    /// Minutes without a progress update before a running job expires
    #[serde(default = "default_job_timeout_minutes")]
    pub job_timeout_minutes: u64,

    /// Root directory for exported files
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            mapping_threads: 0,
            job_timeout_minutes: default_job_timeout_minutes(),
            output_dir: default_output_dir(),
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if !(1..=50_000).contains(&self.batch_size) {
            return Err(format!(
                "export.batch_size must be between 1 and 50000, got {}",
                self.batch_size
            ));
        }

        if !(1..=64).contains(&self.max_concurrent_jobs) {
            return Err(format!(
                "export.max_concurrent_jobs must be between 1 and 64, got {}",
                self.max_concurrent_jobs
            ));
        }

        if self.mapping_threads > 256 {
            return Err("export.mapping_threads must be <= 256".to_string());
        }

        if self.job_timeout_minutes == 0 {
            return Err("export.job_timeout_minutes must be > 0".to_string());
        }

        if self.output_dir.trim().is_empty() {
            return Err("export.output_dir cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Reference data cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDataConfig {
    /// Seconds since last access before a job's tables are dropped
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
}

impl Default for ReferenceDataConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

impl ReferenceDataConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.cache_ttl_seconds == 0 {
            return Err("reference_data.cache_ttl_seconds must be > 0".to_string());
        }
        Ok(())
    }
}

/// Catalog snapshot location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding the JSON catalog snapshots
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl CatalogConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.data_dir.trim().is_empty() {
            return Err("catalog.data_dir cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Job and error log persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// JSON file holding jobs, error logs and profiles
    #[serde(default = "default_store_path")]
    pub store_path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

impl StateConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.store_path.trim().is_empty() {
            return Err("state.store_path cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Rotated log files kept on disk
    #[serde(default = "default_local_max_files")]
    pub local_max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            local_max_files: default_local_max_files(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_max_files == 0 {
            return Err("logging.local_max_files must be > 0".to_string());
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when file logging is on".to_string());
        }

        Ok(())
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_job_timeout_minutes() -> u64 {
    60
}

fn default_output_dir() -> String {
    "./output".to_string()
}

fn default_cache_ttl_seconds() -> u64 {
    60
}

fn default_data_dir() -> String {
    "./catalog".to_string()
}

fn default_store_path() -> String {
    "./state/bibexport-state.json".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_local_max_files() -> usize {
    14
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = BibExportConfig::from_toml_str("").unwrap();
        assert_eq!(config.application.log_level, "info");
        assert_eq!(config.export.batch_size, 1000);
        assert_eq!(config.export.max_concurrent_jobs, 4);
        assert_eq!(config.export.mapping_threads, 0);
        assert_eq!(config.export.job_timeout_minutes, 60);
        assert_eq!(config.reference_data.cache_ttl_seconds, 60);
        assert!(!config.logging.local_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_export_config_validation() {
        let mut config = ExportConfig::default();
        assert!(config.validate().is_ok());

        config.batch_size = 0;
        assert!(config.validate().is_err());

        config.batch_size = 50_001;
        assert!(config.validate().is_err());

        config.batch_size = 50_000;
        config.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());

        config.max_concurrent_jobs = 65;
        assert!(config.validate().is_err());

        config.max_concurrent_jobs = 64;
        config.job_timeout_minutes = 0;
        assert!(config.validate().is_err());

        config.job_timeout_minutes = 5;
        config.output_dir = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_config_validation() {
        let mut config = LoggingConfig::default();
        assert!(config.validate().is_ok());

        config.local_rotation = "weekly".to_string();
        assert!(config.validate().is_err());

        config.local_rotation = "hourly".to_string();
        config.local_max_files = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_sections() {
        let config = BibExportConfig::from_toml_str(
            r#"
[export]
batch_size = 250

[state]
store_path = "/tmp/state.json"
"#,
        )
        .unwrap();
        assert_eq!(config.export.batch_size, 250);
        assert_eq!(config.export.max_concurrent_jobs, 4);
        assert_eq!(config.state.store_path, "/tmp/state.json");
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = BibExportConfig::from_toml_str("[export\nbatch_size = ").unwrap_err();
        assert!(matches!(err, BibExportError::Configuration(_)));
    }

    #[test]
    fn test_toml_render_parses_back() {
        let rendered = BibExportConfig::default().to_toml_string().unwrap();
        let parsed = BibExportConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.export.batch_size, 1000);
        assert_eq!(parsed.catalog.data_dir, "./catalog");
    }
}
