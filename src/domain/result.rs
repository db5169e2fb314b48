//! Result type alias for bibexport
//!
//! This module provides a convenient Result type alias that uses BibExportError
//! as the error type.

use super::errors::BibExportError;

/// Result type alias for bibexport operations
///
/// # Examples
///
/// ```
/// use bibexport::domain::result::Result;
/// use bibexport::domain::errors::BibExportError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(BibExportError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, BibExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
