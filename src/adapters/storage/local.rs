//! Local filesystem storage

use super::traits::Storage;
use crate::domain::{BibExportError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Storage rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create storage rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if path.is_empty() || escapes {
            return Err(BibExportError::Storage(format!(
                "Path '{path}' must be relative to the storage root"
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                BibExportError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        Self::ensure_parent(&full).await?;
        tokio::fs::write(&full, bytes).await.map_err(|e| {
            BibExportError::Storage(format!("Failed to write {}: {e}", full.display()))
        })
    }

    async fn append(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        Self::ensure_parent(&full).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full)
            .await
            .map_err(|e| {
                BibExportError::Storage(format!("Failed to open {}: {e}", full.display()))
            })?;
        file.write_all(bytes).await.map_err(|e| {
            BibExportError::Storage(format!("Failed to append to {}: {e}", full.display()))
        })?;
        file.flush().await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full).await.map_err(|e| {
            BibExportError::Storage(format!("Failed to read {}: {e}", full.display()))
        })
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&full).await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BibExportError::Storage(format!(
                "Failed to delete {}: {e}",
                full.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_append_creates_and_extends() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.append("job/out.mrc", b"one").await.unwrap();
        storage.append("job/out.mrc", b"two").await.unwrap();
        assert_eq!(storage.read("job/out.mrc").await.unwrap(), b"onetwo");
        assert!(storage.exists("job/out.mrc").await.unwrap());
    }

    #[tokio::test]
    async fn test_write_replaces_and_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.write("a.txt", b"first").await.unwrap();
        storage.write("a.txt", b"second").await.unwrap();
        assert_eq!(storage.read("a.txt").await.unwrap(), b"second");
        storage.delete("a.txt").await.unwrap();
        storage.delete("a.txt").await.unwrap();
        assert!(!storage.exists("a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.write("../x", b"").await.is_err());
        assert!(storage.write("/etc/x", b"").await.is_err());
    }
}
