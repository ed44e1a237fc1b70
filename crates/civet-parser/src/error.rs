//! Parser error types

use civet_core::DiagnosticKind;
use thiserror::Error;

/// Parser error
#[derive(Error, Debug)]
pub enum ParseError {
    /// YAML parsing error from the underlying generic parser
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Missing required field
    #[error("Missing required field: {path}")]
    MissingField { path: String },

    /// A field's value matched none of its allowed shapes
    #[error("Field '{path}': cannot interpret {actual} as {expected}")]
    Shape {
        path: String,
        expected: String,
        actual: String,
    },

    /// Invalid field value
    #[error("Invalid value for field '{path}': {message}")]
    InvalidValue { path: String, message: String },

    /// Malformed rule or condition structure
    #[error("Malformed rule at '{path}': {message}")]
    RuleSyntax { path: String, message: String },

    /// The document root is unusable (the only unrecoverable case)
    #[error("Document error: {0}")]
    Document(String),
}

impl ParseError {
    /// The diagnostic kind this error maps to when recorded instead of raised
    pub fn diagnostic_kind(&self) -> DiagnosticKind {
        match self {
            ParseError::RuleSyntax { .. } => DiagnosticKind::RuleSyntax,
            _ => DiagnosticKind::Shape,
        }
    }

    /// The dotted field path this error points at, when one is known
    pub fn path(&self) -> Option<&str> {
        match self {
            ParseError::MissingField { path }
            | ParseError::Shape { path, .. }
            | ParseError::InvalidValue { path, .. }
            | ParseError::RuleSyntax { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, ParseError>;
