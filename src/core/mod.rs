//! Core business logic for bibexport.
//!
//! # Modules
//!
//! - [`rules`] - Rule model, bundled defaults and the rule factory
//! - [`translation`] - Named translation functions
//! - [`processor`] - JSON path reading and rule interpretation
//! - [`reference_data`] - Per-job reference data and its cache
//! - [`mapping`] - Parallel record mapping with per-record fault isolation
//! - [`export`] - Export strategies, orchestrator and expiry sweep
//! - [`state`] - Job state and the error log
//!
//! # Export Workflow
//!
//! 1. **Init**: open the identifier file, derive the output path, mark the job IN_PROGRESS
//! 2. **Chunk**: read the next batch of identifiers
//! 3. **Resolve**: the record type's strategy fetches source records
//! 4. **Map**: the mapping service applies the job's rule set on the mapping pool
//! 5. **Write**: mapped records are appended to the output file
//! 6. **Progress**: counters and merged error rows are persisted
//! 7. **Finalize**: after the last chunk, decide the terminal status
//!
//! # Example
//!
//! ```rust,no_run
//! use bibexport::core::export::ExportService;
//! use bibexport::config::load_config;
//! use bibexport::core::export::ExportRequest;
//! use bibexport::domain::MappingProfile;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("bibexport.toml")?;
//! let service = ExportService::from_config(&config).await?;
//!
//! let request = ExportRequest::new("ids.csv", MappingProfile::default_instance());
//! let job = service.orchestrator.export(request).await?;
//!
//! println!("{}: {} exported", job.status, job.progress.exported);
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod mapping;
pub mod processor;
pub mod reference_data;
pub mod rules;
pub mod state;
pub mod translation;
