//! CIVET Parser - generic tree to entity model
//!
//! This crate turns an already-parsed generic document tree
//! (`serde_yaml::Value`) into the unresolved CIVET entity model. All
//! polymorphic-field ambiguity ("may be written three ways") is isolated in
//! the [`norm`] module; everything downstream works against one canonical
//! shape per field.

pub mod document;
pub mod error;
pub mod include;
pub mod job;
pub mod norm;
pub mod rules;
pub mod yaml;

// Re-export main parser types
pub use document::DocumentParser;
pub use error::{ParseError, Result};
pub use include::IncludeParser;
pub use job::JobParser;
pub use rules::RulesParser;
