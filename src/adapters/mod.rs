//! External system integrations for bibexport.
//!
//! This module provides adapters for the collaborators an export job talks to:
//!
//! - [`catalog`] - Source records and reference data (JSON snapshot)
//! - [`source`] - Identifier file readers
//! - [`storage`] - Output file storage
//! - [`repository`] - Job, error log and profile persistence
//! - [`factory`] - Builds the collaborators named by the configuration
//!
//! # Design Pattern
//!
//! Every collaborator sits behind a trait so the export pipeline can be
//! tested with in-memory implementations.
//!
//! ```rust,no_run
//! use bibexport::adapters::factory::Collaborators;
//! use bibexport::config::BibExportConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BibExportConfig::default();
//! let collaborators = Collaborators::from_config(&config).await?;
//! let instances = collaborators.catalog.fetch_instances(&["inst-1".to_string()]).await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod factory;
pub mod repository;
pub mod source;
pub mod storage;
