//! Domain models and types for bibexport.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`JobExecutionId`], [`ProfileId`])
//! - **Job state** ([`JobExecution`], [`JobStatus`], [`Progress`])
//! - **Mapping profiles** ([`MappingProfile`], [`Transformation`], [`RecordType`])
//! - **Error logs** ([`ErrorLog`], [`ErrorCode`])
//! - **The chunk message** ([`ExportPayload`])
//! - **Error types** ([`BibExportError`], [`TranslationError`], [`MappingError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, BibExportError>`]:
//!
//! ```rust
//! use bibexport::domain::{BibExportError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = bibexport::config::BibExportConfig::from_toml_str("")?;
//!     config.validate().map_err(BibExportError::Configuration)?;
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod error_log;
pub mod errors;
pub mod ids;
pub mod job;
pub mod payload;
pub mod profile;
pub mod result;

// Re-export commonly used types for convenience
pub use error_log::{AffectedRecord, ErrorCode, ErrorLog, LogLevel};
pub use errors::{BibExportError, MappingError, TranslationError};
pub use ids::{JobExecutionId, ProfileId};
pub use job::{final_status, ExportedFile, JobExecution, JobExecutionBuilder, JobStatus, Progress};
pub use payload::{ExportPayload, FileDefinition};
pub use profile::{MappingProfile, OutputFormat, RecordType, Transformation};
pub use result::Result;
