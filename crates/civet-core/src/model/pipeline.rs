//! Pipeline aggregate
//!
//! The pipeline owns all child entities exclusively. Job insertion order is
//! preserved so diagnostics come out in document order.

use crate::error::ModelError;
use crate::model::defaults::DefaultTemplate;
use crate::model::include::Include;
use crate::model::job::Job;
use crate::model::variables::Variables;
use crate::model::workflow::Workflow;
use crate::model::{is_hidden_name, is_reserved_keyword};
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;

/// Stage name assumed when no `stages` list is declared
pub const IMPLICIT_STAGE: &str = "test";

/// Ordered set of jobs, unique by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSet {
    jobs: Vec<Job>,
    index: HashMap<String, usize>,
}

impl JobSet {
    /// Create an empty set
    pub fn new() -> Self {
        JobSet::default()
    }

    /// Insert a job, enforcing name validity and uniqueness
    pub fn insert(&mut self, job: Job) -> Result<(), ModelError> {
        if job.name.is_empty() {
            return Err(ModelError::EmptyJobName);
        }
        if is_reserved_keyword(&job.name) {
            return Err(ModelError::ReservedJobName(job.name));
        }
        if self.index.contains_key(&job.name) {
            return Err(ModelError::DuplicateJob(job.name));
        }
        self.index.insert(job.name.clone(), self.jobs.len());
        self.jobs.push(job);
        Ok(())
    }

    /// Look up a job by name
    pub fn get(&self, name: &str) -> Option<&Job> {
        self.index.get(name).map(|&i| &self.jobs[i])
    }

    /// Mutable lookup by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Job> {
        self.index.get(name).map(|&i| &mut self.jobs[i])
    }

    /// True if a job with `name` exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Replace an existing job in place, keeping its position
    pub fn replace(&mut self, job: Job) -> Result<(), ModelError> {
        match self.index.get(&job.name) {
            Some(&i) => {
                self.jobs[i] = job;
                Ok(())
            }
            None => self.insert(job),
        }
    }

    /// Iterate jobs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    /// Mutable iteration in insertion order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.iter_mut()
    }

    /// Job names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.jobs.iter().map(|j| j.name.as_str())
    }

    /// Jobs that can actually be scheduled (hidden templates excluded)
    pub fn schedulable(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|j| j.schedulable)
    }

    /// Number of jobs (hidden templates included)
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// True if the set holds no jobs
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl IntoIterator for JobSet {
    type Item = Job;
    type IntoIter = std::vec::IntoIter<Job>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.into_iter()
    }
}

/// Top-level validated CI configuration for one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    /// Declared stage order; empty means the single implicit stage
    pub stages: Vec<String>,

    /// Global variables
    pub variables: Variables,

    /// Workflow rules deciding whether the pipeline runs at all
    pub workflow: Option<Workflow>,

    /// Include directives, in declaration order
    pub includes: Vec<Include>,

    /// Global default-job-template
    pub default: Option<DefaultTemplate>,

    /// All jobs and hidden templates, in document order
    pub jobs: JobSet,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Pipeline::default()
    }

    /// Declare a stage, enforcing uniqueness
    pub fn add_stage(&mut self, stage: impl Into<String>) -> Result<(), ModelError> {
        let stage = stage.into();
        if self.stages.contains(&stage) {
            return Err(ModelError::DuplicateStage(stage));
        }
        self.stages.push(stage);
        Ok(())
    }

    /// Register a job, enforcing name uniqueness at insertion time
    pub fn add_job(&mut self, job: Job) -> Result<(), ModelError> {
        self.jobs.insert(job)
    }

    /// The effective stage sequence: declared stages, or the implicit default
    pub fn effective_stages(&self) -> Vec<String> {
        if self.stages.is_empty() {
            vec![IMPLICIT_STAGE.to_string()]
        } else {
            self.stages.clone()
        }
    }

    /// Index of a stage in the effective sequence
    pub fn stage_index(&self, stage: &str) -> Option<usize> {
        if self.stages.is_empty() {
            (stage == IMPLICIT_STAGE).then_some(0)
        } else {
            self.stages.iter().position(|s| s == stage)
        }
    }

    /// The stage a job effectively runs in
    pub fn effective_stage<'a>(&self, job: &'a Job) -> &'a str {
        job.stage.as_deref().unwrap_or(IMPLICIT_STAGE)
    }

    /// Serialize the pipeline back to the generic document tree
    ///
    /// The produced tree is re-validatable: feeding it through the validator
    /// again yields an equivalent model.
    pub fn to_tree(&self) -> Value {
        let mut root = Mapping::new();

        if !self.stages.is_empty() {
            root.insert(
                Value::String("stages".to_string()),
                serde_yaml::to_value(&self.stages).unwrap_or(Value::Null),
            );
        }
        if let Some(workflow) = &self.workflow {
            root.insert(
                Value::String("workflow".to_string()),
                serde_yaml::to_value(workflow).unwrap_or(Value::Null),
            );
        }
        if !self.includes.is_empty() {
            root.insert(
                Value::String("include".to_string()),
                serde_yaml::to_value(&self.includes).unwrap_or(Value::Null),
            );
        }
        if let Some(default) = &self.default {
            if !default.is_empty() {
                root.insert(
                    Value::String("default".to_string()),
                    serde_yaml::to_value(default).unwrap_or(Value::Null),
                );
            }
        }
        if !self.variables.is_empty() {
            root.insert(
                Value::String("variables".to_string()),
                serde_yaml::to_value(&self.variables).unwrap_or(Value::Null),
            );
        }
        for job in self.jobs.iter() {
            root.insert(
                Value::String(job.name.clone()),
                serde_yaml::to_value(job).unwrap_or(Value::Null),
            );
        }

        Value::Mapping(root)
    }

    /// True if `name` would be treated as a hidden template
    pub fn is_hidden(name: &str) -> bool {
        is_hidden_name(name)
    }
}
