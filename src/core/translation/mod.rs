//! Translation functions
//!
//! A translation turns one raw value read from a record into its output form:
//! a constant, a reference data lookup, or a date rendering. Functions are
//! plain `fn` pointers looked up by name, so a registry is cheap to share
//! across mapping workers.

pub mod functions;

use crate::core::reference_data::ReferenceData;
use crate::core::rules::Translation;
use crate::domain::TranslationError;
use std::collections::{BTreeMap, HashMap};

/// Inputs available to a translation function besides the value itself
#[derive(Debug, Clone, Copy)]
pub struct TranslationContext<'a> {
    /// Constant parameters of the translation
    pub parameters: &'a BTreeMap<String, String>,
    /// Reference data of the running job
    pub reference_data: &'a ReferenceData,
    /// Rule metadata resolved against the current record
    pub metadata: &'a BTreeMap<String, String>,
}

impl<'a> TranslationContext<'a> {
    /// Parameter by name
    pub fn parameter(&self, name: &str) -> Option<&'a str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Metadata value by name, ignoring blanks
    pub fn metadata(&self, name: &str) -> Option<&'a str> {
        self.metadata
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Signature of every translation function
pub type TranslationFn = fn(&str, &TranslationContext<'_>) -> Result<String, TranslationError>;

/// Name to function table
#[derive(Debug, Clone)]
pub struct TranslationRegistry {
    functions: HashMap<String, TranslationFn>,
}

impl Default for TranslationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationRegistry {
    /// Registry with every built-in function
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for (name, function) in functions::BUILTIN {
            registry.register(*name, *function);
        }
        registry
    }

    /// Registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Add or replace a function
    pub fn register(&mut self, name: impl Into<String>, function: TranslationFn) {
        self.functions.insert(name.into(), function);
    }

    /// Returns true when `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Apply `translation` to `value`
    ///
    /// # Errors
    ///
    /// Returns [`TranslationError::UnknownFunction`] for unregistered names,
    /// otherwise whatever the function reports.
    pub fn apply(
        &self,
        translation: &Translation,
        value: &str,
        reference_data: &ReferenceData,
        metadata: &BTreeMap<String, String>,
    ) -> Result<String, TranslationError> {
        let function = self
            .functions
            .get(&translation.function)
            .ok_or_else(|| TranslationError::UnknownFunction(translation.function.clone()))?;
        let context = TranslationContext {
            parameters: &translation.parameters,
            reference_data,
            metadata,
        };
        function(value, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_function() {
        let registry = TranslationRegistry::new();
        let err = registry
            .apply(
                &Translation::new("set_nothing"),
                "x",
                &ReferenceData::new(),
                &BTreeMap::new(),
            )
            .unwrap_err();
        assert_eq!(err, TranslationError::UnknownFunction("set_nothing".into()));
    }

    #[test]
    fn test_register_custom_function() {
        fn shout(value: &str, _: &TranslationContext<'_>) -> Result<String, TranslationError> {
            Ok(value.to_uppercase())
        }

        let mut registry = TranslationRegistry::empty();
        assert!(!registry.contains("set_value"));
        registry.register("shout", shout);
        let out = registry
            .apply(
                &Translation::new("shout"),
                "abc",
                &ReferenceData::new(),
                &BTreeMap::new(),
            )
            .unwrap();
        assert_eq!(out, "ABC");
    }

    #[test]
    fn test_builtins_registered() {
        let registry = TranslationRegistry::new();
        for (name, _) in functions::BUILTIN {
            assert!(registry.contains(name), "{name} missing");
        }
    }
}
