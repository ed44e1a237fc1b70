//! Typed entity model for GitLab CI configuration
//!
//! This module contains the entity definitions for:
//! - Pipelines and jobs
//! - Rules and workflows
//! - Includes and fragments
//! - Caches, artifacts, environments, services
//! - Parallel/matrix expansion specifications

pub mod artifacts;
pub mod cache;
pub mod defaults;
pub mod environment;
pub mod include;
pub mod job;
pub mod parallel;
pub mod pipeline;
pub mod rule;
pub mod variables;
pub mod workflow;

pub use artifacts::{Artifacts, ArtifactsWhen};
pub use cache::{Cache, CacheKey, CachePolicy};
pub use defaults::DefaultTemplate;
pub use environment::{Environment, EnvironmentAction, Service};
pub use include::{Include, IncludeRef};
pub use job::{AllowFailure, Job, Need, OnlyExcept, Retry, Trigger, When, MAX_RETRY};
pub use parallel::{Matrix, MatrixDimension, Parallel, MAX_PARALLEL, MIN_PARALLEL};
pub use pipeline::{JobSet, Pipeline, IMPLICIT_STAGE};
pub use rule::Rule;
pub use variables::{VariableValue, Variables};
pub use workflow::Workflow;

/// Prefix marking a job-shaped entity as a hidden template
pub const HIDDEN_JOB_PREFIX: char = '.';

/// Top-level configuration keywords that can never be job names
pub const RESERVED_KEYWORDS: &[&str] = &[
    "stages",
    "variables",
    "workflow",
    "include",
    "default",
    "image",
    "services",
    "cache",
    "before_script",
    "after_script",
];

/// True if `name` denotes a hidden template rather than a schedulable job
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with(HIDDEN_JOB_PREFIX)
}

/// True if `name` is a reserved top-level keyword
pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(&name)
}
