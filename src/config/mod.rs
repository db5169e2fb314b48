//! Configuration management for bibexport.
//!
//! # Overview
//!
//! bibexport uses a TOML configuration file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `BIBEXPORT_<SECTION>_<KEY>` overrides applied after parsing
//! - Default values for every setting
//! - Range validation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bibexport::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("bibexport.toml")?;
//! println!("Batch size: {}", config.export.batch_size);
//! println!("Catalog: {}", config.catalog.data_dir);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`ExportConfig`] - Chunk size, pools, job timeout, output directory
//! - [`ReferenceDataConfig`] - Reference data cache TTL
//! - [`CatalogConfig`] - Catalog snapshot directory
//! - [`StateConfig`] - Job and error log store
//! - [`LoggingConfig`] - File logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [export]
//! batch_size = 1000
//! max_concurrent_jobs = 4
//! mapping_threads = 0
//! job_timeout_minutes = 60
//! output_dir = "${BIBEXPORT_OUTPUT}"
//!
//! [reference_data]
//! cache_ttl_seconds = 60
//!
//! [catalog]
//! data_dir = "./catalog"
//!
//! [state]
//! store_path = "./state/bibexport-state.json"
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, BibExportConfig, CatalogConfig, ExportConfig, LoggingConfig,
    ReferenceDataConfig, StateConfig,
};
