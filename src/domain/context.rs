//! Error context extension trait
//!
//! Adds `.context()` and `.with_context()` to any `Result` whose error converts
//! into [`BibExportError`], so library code can annotate failures without
//! leaving the domain error type.
//!
//! ```rust
//! use bibexport::domain::Result;
//! use bibexport::domain::context::ResultExt;
//!
//! fn read_ids(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
//! }
//! ```

use crate::domain::errors::BibExportError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error, evaluated eagerly
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add context to an error, evaluated only on failure
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<BibExportError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| BibExportError::Other(format!("{context}: {}", e.into())))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| {
            let base_error = e.into();
            BibExportError::Other(format!("{}: {base_error}", f()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::TranslationError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_context_wraps_message() {
        let result: Result<()> = Err(BibExportError::Storage("disk full".to_string()));
        let err = result.context("Failed to append chunk").unwrap_err();
        assert!(err.to_string().contains("Failed to append chunk"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_with_context_is_lazy() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let result: Result<i32> = Ok(7);
        let out = result.with_context(|| {
            flag.store(true, Ordering::SeqCst);
            "never"
        });
        assert_eq!(out.unwrap(), 7);
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_context_from_narrow_error() {
        let result: std::result::Result<(), TranslationError> =
            Err(TranslationError::InvalidDate("2020-13-45".to_string()));
        let err = result.context("Failed to translate 005").unwrap_err();
        assert!(err.to_string().contains("2020-13-45"));
    }
}
