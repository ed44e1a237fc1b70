//! Global default job template
//!
//! The `default:` block supplies values for fields a job leaves unset. It is
//! applied after `extends` resolution, so explicit and inherited values always
//! win over defaults.

use crate::model::artifacts::Artifacts;
use crate::model::cache::Cache;
use crate::model::environment::Service;
use crate::model::job::{Job, Retry};
use serde::Serialize;

/// Global default-job-template block
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DefaultTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<Service>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<Cache>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Artifacts>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_script: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_script: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<Retry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interruptible: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl DefaultTemplate {
    /// Create an empty default template
    pub fn new() -> Self {
        DefaultTemplate::default()
    }

    /// True if no default is set at all
    pub fn is_empty(&self) -> bool {
        *self == DefaultTemplate::default()
    }

    /// Fill every unset field of `job` from this template
    ///
    /// Hidden templates are left untouched; defaults only apply to jobs that
    /// can actually be scheduled.
    pub fn apply_to(&self, job: &mut Job) {
        if !job.schedulable {
            return;
        }
        if job.image.is_none() {
            job.image = self.image.clone();
        }
        if job.services.is_none() {
            job.services = self.services.clone();
        }
        if job.cache.is_none() {
            job.cache = self.cache.clone();
        }
        if job.artifacts.is_none() {
            job.artifacts = self.artifacts.clone();
        }
        if job.before_script.is_none() {
            job.before_script = self.before_script.clone();
        }
        if job.after_script.is_none() {
            job.after_script = self.after_script.clone();
        }
        if job.tags.is_none() {
            job.tags = self.tags.clone();
        }
        if job.retry.is_none() {
            job.retry = self.retry.clone();
        }
        if job.interruptible.is_none() {
            job.interruptible = self.interruptible;
        }
        if job.timeout.is_none() {
            job.timeout = self.timeout.clone();
        }
    }
}
