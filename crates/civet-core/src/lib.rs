//! CIVET Core - Entity model and diagnostics for GitLab CI configuration
//!
//! This crate provides the fundamental types used across the CIVET ecosystem:
//! - Typed entity model (Pipeline, Job, Rule, Workflow, Include, ...)
//! - Diagnostic records produced by validation
//! - Error types

pub mod diagnostics;
pub mod error;
pub mod model;

// Re-export commonly used types
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::ModelError;
pub use model::{Job, Pipeline};
