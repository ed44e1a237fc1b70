//! Workflow definitions
//!
//! Workflow rules are evaluated once per pipeline instance to decide whether
//! the pipeline runs at all.

use crate::model::rule::Rule;
use serde::Serialize;

/// Global workflow block
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Workflow {
    /// Optional dynamic pipeline name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Ordered rule list; first match decides whether the pipeline runs
    pub rules: Vec<Rule>,
}

impl Workflow {
    /// Create a workflow with the given rules
    pub fn new(rules: Vec<Rule>) -> Self {
        Workflow { name: None, rules }
    }

    /// Set the pipeline name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
