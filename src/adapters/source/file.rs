//! Identifier file reader
//!
//! One identifier per line. Surrounding whitespace and double quotes are
//! stripped and blank lines skipped, so single-column CSV exports work as-is.

use super::traits::{SourceReader, SourceReaderFactory};
use crate::domain::{BibExportError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

fn normalize(line: &str) -> Option<String> {
    let id = line.trim().trim_matches('"').trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Streaming reader over an identifier file
pub struct FileSourceReader {
    lines: Option<Lines<BufReader<File>>>,
    pending: Option<String>,
    batch_size: usize,
    total: u64,
}

impl FileSourceReader {
    /// Open `path`, counting its identifiers first
    ///
    /// # Errors
    ///
    /// Returns [`BibExportError::SourceReader`] when the file cannot be opened
    /// or `batch_size` is zero.
    pub async fn open(path: impl AsRef<Path>, batch_size: usize) -> Result<Self> {
        let path = path.as_ref();
        if batch_size == 0 {
            return Err(BibExportError::SourceReader(
                "Batch size must be greater than zero".to_string(),
            ));
        }

        let mut total = 0u64;
        let mut counter = Self::open_lines(path).await?;
        while let Some(line) = counter.next_line().await.map_err(|e| read_error(path, e))? {
            if normalize(&line).is_some() {
                total += 1;
            }
        }

        Ok(Self {
            lines: Some(Self::open_lines(path).await?),
            pending: None,
            batch_size,
            total,
        })
    }

    async fn open_lines(path: &Path) -> Result<Lines<BufReader<File>>> {
        let file = File::open(path).await.map_err(|e| {
            BibExportError::SourceReader(format!("Failed to open {}: {e}", path.display()))
        })?;
        Ok(BufReader::new(file).lines())
    }

    async fn fill_pending(&mut self) -> Result<()> {
        while self.pending.is_none() {
            let Some(lines) = self.lines.as_mut() else {
                return Ok(());
            };
            match lines.next_line().await? {
                Some(line) => self.pending = normalize(&line),
                None => {
                    self.lines = None;
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

fn read_error(path: &Path, e: std::io::Error) -> BibExportError {
    BibExportError::SourceReader(format!("Failed to read {}: {e}", path.display()))
}

#[async_trait]
impl SourceReader for FileSourceReader {
    async fn has_next(&mut self) -> Result<bool> {
        self.fill_pending().await?;
        Ok(self.pending.is_some())
    }

    async fn read_next(&mut self) -> Result<Vec<String>> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size && self.has_next().await? {
            if let Some(id) = self.pending.take() {
                batch.push(id);
            }
        }
        Ok(batch)
    }

    fn total_count(&self) -> u64 {
        self.total
    }

    async fn close(&mut self) -> Result<()> {
        self.lines = None;
        self.pending = None;
        Ok(())
    }
}

/// Opens [`FileSourceReader`]s, resolving relative paths against a base directory
#[derive(Debug, Clone, Default)]
pub struct FileSourceReaderFactory {
    base_dir: Option<PathBuf>,
}

impl FileSourceReaderFactory {
    /// Factory resolving relative paths against `base_dir`
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }
}

#[async_trait]
impl SourceReaderFactory for FileSourceReaderFactory {
    async fn open(&self, file_ref: &str, batch_size: usize) -> Result<Box<dyn SourceReader>> {
        let path = match &self.base_dir {
            Some(base) if Path::new(file_ref).is_relative() => base.join(file_ref),
            _ => PathBuf::from(file_ref),
        };
        Ok(Box::new(FileSourceReader::open(path, batch_size).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn id_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_batches_and_total() {
        let file = id_file("a\n\"b\"\n\n  c  \nd\ne\n");
        let mut reader = FileSourceReader::open(file.path(), 2).await.unwrap();
        assert_eq!(reader.total_count(), 5);

        let mut batches = Vec::new();
        while reader.has_next().await.unwrap() {
            batches.push(reader.read_next().await.unwrap());
        }
        assert_eq!(
            batches,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string(), "d".to_string()],
                vec!["e".to_string()],
            ]
        );
        reader.close().await.unwrap();
        assert!(!reader.has_next().await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_file() {
        let file = id_file("\n\n");
        let mut reader = FileSourceReader::open(file.path(), 10).await.unwrap();
        assert_eq!(reader.total_count(), 0);
        assert!(!reader.has_next().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_is_source_error() {
        let err = FileSourceReader::open("/definitely/not/here.txt", 10)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BibExportError::SourceReader(_)));
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let file = id_file("a\n");
        assert!(FileSourceReader::open(file.path(), 0).await.is_err());
    }
}
