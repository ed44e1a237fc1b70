//! CIVET Validator - semantic validation for CI configuration
//!
//! This crate takes the unresolved entity model produced by `civet-parser`
//! and makes it concrete: `extends` chains are flattened, `include`
//! fragments composed, defaults applied, `parallel` specifications expanded,
//! and the result checked for dangling references, ordering violations, and
//! dependency cycles.
//!
//! The [`Validator`] facade runs all phases in order and collects
//! diagnostics across them; the phase types are public for callers that only
//! need one step.

pub mod dag;
pub mod error;
pub mod extends;
pub mod include;
pub mod matrix;
pub mod rules;
pub mod validator;

// Re-export main validator types
pub use dag::{DependencyValidator, JobGraph};
pub use error::{Result, ValidateError};
pub use extends::TemplateResolver;
pub use include::{FragmentComposer, IncludeResolver, StaticResolver};
pub use matrix::MatrixExpander;
pub use rules::RuleChecker;
pub use validator::{ValidatedPipeline, Validator, ValidatorOptions};
