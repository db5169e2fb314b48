//! Identifier source traits

use crate::domain::Result;
use async_trait::async_trait;

/// Batched reader over a file of record identifiers
///
/// Resumable only within one run; there is no persisted cursor.
#[async_trait]
pub trait SourceReader: Send {
    /// Returns true when another identifier is available
    async fn has_next(&mut self) -> Result<bool>;

    /// Next batch of at most `batch_size` identifiers
    async fn read_next(&mut self) -> Result<Vec<String>>;

    /// Identifiers in the whole input
    fn total_count(&self) -> u64;

    /// Release the underlying input
    async fn close(&mut self) -> Result<()>;
}

/// Opens readers over identifier files
#[async_trait]
pub trait SourceReaderFactory: Send + Sync {
    /// Open `file_ref` with the given batch size
    async fn open(&self, file_ref: &str, batch_size: usize) -> Result<Box<dyn SourceReader>>;
}
