//! Collaborator factory
//!
//! Builds the concrete collaborators named by the configuration.

use crate::adapters::catalog::{CatalogClient, JsonCatalog};
use crate::adapters::repository::FileStateStore;
use crate::adapters::source::{FileSourceReaderFactory, SourceReaderFactory};
use crate::adapters::storage::{LocalStorage, Storage};
use crate::config::BibExportConfig;
use crate::domain::{BibExportError, Result};
use std::sync::Arc;

/// The external collaborators of an export service
#[derive(Clone)]
pub struct Collaborators {
    /// Source records and reference data
    pub catalog: Arc<dyn CatalogClient>,
    /// Output files
    pub storage: Arc<dyn Storage>,
    /// Job, error log and profile persistence
    pub state: Arc<FileStateStore>,
    /// Identifier file readers
    pub readers: Arc<dyn SourceReaderFactory>,
}

impl Collaborators {
    /// Build every collaborator from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog snapshot or the state file cannot be
    /// loaded.
    pub async fn from_config(config: &BibExportConfig) -> Result<Self> {
        Ok(Self {
            catalog: create_catalog(config).await?,
            storage: create_storage(config),
            state: create_state_store(config).await?,
            readers: Arc::new(FileSourceReaderFactory::new(None)),
        })
    }
}

/// Create the catalog client
///
/// # Errors
///
/// Returns [`BibExportError::Catalog`] if the data directory holds an invalid
/// collection file.
pub async fn create_catalog(config: &BibExportConfig) -> Result<Arc<dyn CatalogClient>> {
    tracing::info!(data_dir = %config.catalog.data_dir, "Loading catalog snapshot");
    let catalog = JsonCatalog::from_dir(&config.catalog.data_dir).await?;
    Ok(Arc::new(catalog))
}

/// Create the output storage
pub fn create_storage(config: &BibExportConfig) -> Arc<dyn Storage> {
    Arc::new(LocalStorage::new(&config.export.output_dir))
}

/// Open the state store
///
/// # Errors
///
/// Returns [`BibExportError::Repository`] if the state file exists but cannot
/// be parsed.
pub async fn create_state_store(config: &BibExportConfig) -> Result<Arc<FileStateStore>> {
    let path = &config.state.store_path;
    if path.trim().is_empty() {
        return Err(BibExportError::Configuration(
            "state.store_path cannot be empty".to_string(),
        ));
    }
    tracing::info!(store_path = %path, "Opening state store");
    Ok(Arc::new(FileStateStore::open(path).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_from_config_with_empty_dirs() {
        let dir = TempDir::new().unwrap();
        let mut config = BibExportConfig::default();
        config.catalog.data_dir = dir.path().join("catalog").to_string_lossy().to_string();
        config.export.output_dir = dir.path().join("out").to_string_lossy().to_string();
        config.state.store_path = dir
            .path()
            .join("state.json")
            .to_string_lossy()
            .to_string();

        let collaborators = Collaborators::from_config(&config).await.unwrap();
        assert!(!collaborators.storage.exists("missing.mrc").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_store_path_rejected() {
        let mut config = BibExportConfig::default();
        config.state.store_path = " ".to_string();
        assert!(matches!(
            create_state_store(&config).await,
            Err(BibExportError::Configuration(_))
        ));
    }
}
