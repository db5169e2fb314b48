// bibexport - MARC export of library catalog records
// Copyright (c) 2025 bibexport Contributors
// Licensed under the MIT License

//! # bibexport - MARC export of library catalog records
//!
//! bibexport turns inventory records (instances, holdings, items) and stored
//! MARC records into MARC 21 output files. Exports run as background jobs
//! that read a file of record identifiers in chunks.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Mapping** inventory JSON to MARC with configurable rules and named translation functions
//! - **Passing through** stored MARC records, with holdings and item data added on top
//! - **Writing** ISO 2709 or MARC-in-JSON output, one file per job
//! - **Tracking** job progress, terminal status and a merged error log
//!
//! ## Architecture
//!
//! bibexport follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (rules, mapping, export orchestration, job state)
//! - [`adapters`] - Collaborators (catalog, identifier files, storage, state store)
//! - [`domain`] - Core domain types and models
//! - [`marc`] - MARC record model and codecs
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bibexport::config::BibExportConfig;
//! use bibexport::core::export::{ExportRequest, ExportService};
//! use bibexport::domain::MappingProfile;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BibExportConfig::from_file("bibexport.toml")?;
//!     let service = ExportService::from_config(&config).await?;
//!
//!     let request = ExportRequest::new("ids.csv", MappingProfile::default_instance());
//!     let job = service.orchestrator.export(request).await?;
//!
//!     println!("Job {} finished as {}", job.hrid, job.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Mapping Rules
//!
//! Rules are built per job from the bundled defaults and the profile's
//! transformations, then applied to every record of the job:
//!
//! ```rust,no_run
//! use bibexport::core::rules::{DefaultRules, RuleFactory};
//! use bibexport::domain::{MappingProfile, RecordType};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = RuleFactory::new(Arc::new(DefaultRules::load()?));
//! let rules = factory.create(&MappingProfile::default_instance(), RecordType::Instance);
//! println!("{} rules", rules.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! bibexport uses the [`domain::BibExportError`] type for all errors:
//!
//! ```rust,no_run
//! use bibexport::domain::BibExportError;
//!
//! fn example() -> Result<(), BibExportError> {
//!     let config = bibexport::config::load_config("bibexport.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! bibexport uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!("Starting export");
//! warn!(job_execution_id = "3f1c...", "Chunk failed");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod marc;
