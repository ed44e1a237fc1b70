//! Error types for CIVET Core

use thiserror::Error;

/// Core error type for programmatic model construction
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Duplicate job name: {0}")]
    DuplicateJob(String),

    #[error("Duplicate stage name: {0}")]
    DuplicateStage(String),

    #[error("Job name cannot be empty")]
    EmptyJobName,

    #[error("'{0}' is a reserved configuration keyword and cannot be used as a job name")]
    ReservedJobName(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
