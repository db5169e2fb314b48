//! Output storage trait

use crate::domain::Result;
use async_trait::async_trait;

/// Output storage
///
/// Paths are relative to the storage root and use `/` separators.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create or replace the object at `path`
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Append to the object at `path`, creating it when absent
    async fn append(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read the whole object
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Returns true when the object exists
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Delete the object; deleting a missing object is not an error
    async fn delete(&self, path: &str) -> Result<()>;
}
