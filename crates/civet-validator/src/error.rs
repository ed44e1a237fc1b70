//! Validator error types

use civet_core::DiagnosticKind;
use thiserror::Error;

/// Validation error
///
/// Most of these are recorded as diagnostics rather than raised, so one
/// document pass reports every problem it can find. Raising is reserved for
/// conditions that make the rest of the pass meaningless.
#[derive(Error, Debug)]
pub enum ValidateError {
    /// Parse failure bubbling up from the document parser
    #[error(transparent)]
    Parse(#[from] civet_parser::ParseError),

    /// `extends` names a job that does not exist
    #[error("Job '{job}' extends unknown template '{reference}'")]
    UnknownTemplate { job: String, reference: String },

    /// Circular `extends` chain
    #[error("Circular extends chain: {}", chain.join(" -> "))]
    ExtendsCycle { chain: Vec<String> },

    /// Circular include chain
    #[error("Circular include chain: {}", chain.join(" -> "))]
    IncludeCycle { chain: Vec<String> },

    /// An include directive could not be fetched or parsed
    #[error("Failed to resolve include '{reference}': {source}")]
    IncludeResolution {
        reference: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `needs` names a job that does not exist
    #[error("Job '{job}' needs unknown job '{reference}'")]
    UnknownNeed { job: String, reference: String },

    /// A needed job runs in a later stage than the dependent
    #[error("Job '{job}' (stage '{job_stage}') needs '{needed}' from later stage '{needed_stage}'")]
    StageOrder {
        job: String,
        job_stage: String,
        needed: String,
        needed_stage: String,
    },

    /// Circular `needs` chain
    #[error("Circular needs chain: {}", chain.join(" -> "))]
    NeedsCycle { chain: Vec<String> },

    /// A job references a stage missing from the declared list
    #[error("Job '{job}' uses undeclared stage '{stage}'")]
    UnknownStage { job: String, stage: String },
}

impl ValidateError {
    /// The diagnostic kind this error maps to when recorded instead of raised
    pub fn diagnostic_kind(&self) -> DiagnosticKind {
        match self {
            ValidateError::Parse(err) => err.diagnostic_kind(),
            ValidateError::UnknownTemplate { .. } | ValidateError::ExtendsCycle { .. } => {
                DiagnosticKind::Extends
            }
            ValidateError::IncludeCycle { .. } => DiagnosticKind::IncludeCycle,
            ValidateError::IncludeResolution { .. } => DiagnosticKind::IncludeResolution,
            ValidateError::UnknownNeed { .. }
            | ValidateError::StageOrder { .. }
            | ValidateError::NeedsCycle { .. }
            | ValidateError::UnknownStage { .. } => DiagnosticKind::Dependency,
        }
    }
}

/// Result type for validator operations
pub type Result<T> = std::result::Result<T, ValidateError>;
