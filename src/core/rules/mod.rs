//! Mapping rules
//!
//! - [`model`] - Rule, DataSource, Translation
//! - [`defaults`] - bundled default rule sets
//! - [`factory`] - builds one job's rule set from defaults and profile

pub mod defaults;
pub mod factory;
pub mod model;

pub use defaults::DefaultRules;
pub use factory::RuleFactory;
pub use model::{DataSource, Rule, RuleSet, Translation, LEADER};
