//! Identifier source collaborator

pub mod file;
pub mod traits;

pub use file::{FileSourceReader, FileSourceReaderFactory};
pub use traits::{SourceReader, SourceReaderFactory};
