//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod expire;
pub mod export;
pub mod init;
pub mod status;
pub mod validate;

use crate::config::{load_config, BibExportConfig};

/// Load and validate the configuration, printing the failure
///
/// Returns the exit code to use when the configuration is unusable.
pub(crate) fn load_valid_config(config_path: &str) -> Result<BibExportConfig, i32> {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            eprintln!("❌ Failed to load configuration file: {e}");
            return Err(2);
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration validation failed");
        eprintln!("❌ Configuration validation failed: {e}");
        return Err(2);
    }
    Ok(config)
}
