//! Rule interpretation
//!
//! - [`path`] - JSON path subset used by data sources
//! - [`value`] - values read from a record
//! - [`interpreter`] - [`RuleProcessor`], rules applied to one record

pub mod interpreter;
pub mod path;
pub mod value;

pub use interpreter::{RuleProcessor, TranslationFailure};
pub use path::JsonPath;
pub use value::{RuleValue, StringValue};
