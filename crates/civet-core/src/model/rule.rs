//! Conditional rule definitions
//!
//! Rules decide whether and how a job (or the whole pipeline, via workflow
//! rules) is included. Only structural well-formedness is modeled here; the
//! truth value of a condition expression is runtime semantics and outside
//! this crate's boundary.

use crate::model::job::{AllowFailure, When};
use crate::model::variables::Variables;
use serde::Serialize;

/// A single conditional clause in a `rules` list
///
/// The first matching rule in a job's list determines inclusion and the
/// effective `when`/`variables` for that job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rule {
    /// Opaque predicate expression, e.g. `$CI_COMMIT_BRANCH == "main"`
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_condition: Option<String>,

    /// File-change glob patterns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<String>>,

    /// File-existence glob patterns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<Vec<String>>,

    /// Effective `when` if this rule matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<When>,

    /// Effective `allow_failure` if this rule matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_failure: Option<AllowFailure>,

    /// Variable overlay applied if this rule matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Variables>,
}

impl Rule {
    /// Create an empty rule
    pub fn new() -> Self {
        Rule::default()
    }

    /// Set the condition expression
    pub fn with_if(mut self, condition: impl Into<String>) -> Self {
        self.if_condition = Some(condition.into());
        self
    }

    /// Set the change patterns
    pub fn with_changes(mut self, changes: Vec<String>) -> Self {
        self.changes = Some(changes);
        self
    }

    /// Set the effective `when`
    pub fn with_when(mut self, when: When) -> Self {
        self.when = Some(when);
        self
    }

    /// Set the variable overlay
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = Some(variables);
        self
    }

    /// True if the rule carries no condition and no effect at all
    pub fn is_vacuous(&self) -> bool {
        self.if_condition.is_none()
            && self.changes.is_none()
            && self.exists.is_none()
            && self.when.is_none()
            && self.allow_failure.is_none()
            && self.variables.is_none()
    }
}
