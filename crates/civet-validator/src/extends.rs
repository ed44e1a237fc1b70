//! Template resolution
//!
//! Flattens `extends` chains into self-contained jobs. Merge semantics are
//! field-kind dependent:
//! - scalar fields: the child's value wins when set, otherwise the parent's
//! - mapping fields (`variables`, `cache`, `artifacts`, `environment`,
//!   `trigger`, structured `retry`): merged key by key, the child's entry
//!   winning per key and the parent's entries retained where the child is
//!   silent
//! - sequence fields (`script`, `tags`, `needs`, ...): replaced wholesale, a
//!   child sequence completely shadows the parent's
//!
//! With multiple parents, parents are merged left to right (a later parent
//! overriding an earlier one) before the child is laid on top.

use crate::error::{Result, ValidateError};
use civet_core::diagnostics::Diagnostics;
use civet_core::model::{
    Artifacts, Cache, Environment, Job, Pipeline, Retry, Trigger, Variables,
};
use std::collections::HashMap;

/// Resolves `extends` references across a pipeline
pub struct TemplateResolver {
    resolved: HashMap<String, Job>,
    stack: Vec<String>,
}

impl TemplateResolver {
    pub fn new() -> Self {
        TemplateResolver {
            resolved: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Resolve every job in the pipeline in place
    ///
    /// A job whose chain is broken (unknown parent, cycle) is recorded as a
    /// diagnostic and left unmerged with its `extends` cleared, so later
    /// phases can still inspect it. Resolution of job A is independent of
    /// job B's failures.
    pub fn resolve_pipeline(&mut self, pipeline: &mut Pipeline, diags: &mut Diagnostics) {
        let names: Vec<String> = pipeline.jobs.names().map(str::to_string).collect();

        for name in names {
            self.stack.clear();
            match self.resolve_job(&name, pipeline) {
                Ok(job) => {
                    // replace cannot fail for a name read off the set
                    let _ = pipeline.jobs.replace(job);
                }
                Err(err) => {
                    diags.error(err.diagnostic_kind(), &name, err.to_string());
                    if let Some(job) = pipeline.jobs.get_mut(&name) {
                        job.extends.clear();
                    }
                }
            }
        }
    }

    /// Resolve one job, memoized
    fn resolve_job(&mut self, name: &str, pipeline: &Pipeline) -> Result<Job> {
        if let Some(done) = self.resolved.get(name) {
            return Ok(done.clone());
        }
        if self.stack.iter().any(|n| n == name) {
            let mut chain: Vec<String> = self
                .stack
                .iter()
                .skip_while(|n| *n != name)
                .cloned()
                .collect();
            chain.push(name.to_string());
            return Err(ValidateError::ExtendsCycle { chain });
        }

        let job = pipeline
            .jobs
            .get(name)
            .ok_or_else(|| ValidateError::UnknownTemplate {
                job: self.stack.last().cloned().unwrap_or_default(),
                reference: name.to_string(),
            })?
            .clone();

        if job.extends.is_empty() {
            return Ok(job);
        }

        self.stack.push(name.to_string());
        let mut merged: Option<Job> = None;
        for parent_name in &job.extends {
            if !pipeline.jobs.contains(parent_name) {
                self.stack.pop();
                return Err(ValidateError::UnknownTemplate {
                    job: name.to_string(),
                    reference: parent_name.clone(),
                });
            }
            let parent = self.resolve_job(parent_name, pipeline);
            let parent = match parent {
                Ok(parent) => parent,
                Err(err) => {
                    self.stack.pop();
                    return Err(err);
                }
            };
            merged = Some(match merged {
                Some(base) => merge_job(&base, &parent),
                None => parent,
            });
        }
        self.stack.pop();

        let mut result = merge_job(&merged.unwrap_or_else(|| Job::new(name)), &job);
        result.extends.clear();
        self.resolved.insert(name.to_string(), result.clone());
        Ok(result)
    }
}

impl Default for TemplateResolver {
    fn default() -> Self {
        TemplateResolver::new()
    }
}

/// Merge `overlay` on top of `base`
///
/// Identity (name, schedulable) always comes from the overlay.
pub fn merge_job(base: &Job, overlay: &Job) -> Job {
    let mut job = Job::new(&overlay.name);
    job.extends = overlay.extends.clone();

    job.stage = overlay.stage.clone().or_else(|| base.stage.clone());
    job.image = overlay.image.clone().or_else(|| base.image.clone());
    job.script = overlay.script.clone().or_else(|| base.script.clone());
    job.before_script = overlay
        .before_script
        .clone()
        .or_else(|| base.before_script.clone());
    job.after_script = overlay
        .after_script
        .clone()
        .or_else(|| base.after_script.clone());
    job.needs = overlay.needs.clone().or_else(|| base.needs.clone());
    job.rules = overlay.rules.clone().or_else(|| base.rules.clone());
    job.only = overlay.only.clone().or_else(|| base.only.clone());
    job.except = overlay.except.clone().or_else(|| base.except.clone());
    job.cache = merge_mapping_field(&base.cache, &overlay.cache, Cache::merged_with);
    job.artifacts = merge_mapping_field(&base.artifacts, &overlay.artifacts, Artifacts::merged_with);
    job.environment = merge_mapping_field(
        &base.environment,
        &overlay.environment,
        Environment::merged_with,
    );
    job.services = overlay.services.clone().or_else(|| base.services.clone());
    job.parallel = overlay.parallel.clone().or_else(|| base.parallel.clone());
    job.when = overlay.when.or(base.when);
    job.allow_failure = overlay
        .allow_failure
        .clone()
        .or_else(|| base.allow_failure.clone());
    job.tags = overlay.tags.clone().or_else(|| base.tags.clone());
    job.timeout = overlay.timeout.clone().or_else(|| base.timeout.clone());
    job.retry = merge_mapping_field(&base.retry, &overlay.retry, Retry::merged_with);
    job.interruptible = overlay.interruptible.or(base.interruptible);
    job.resource_group = overlay
        .resource_group
        .clone()
        .or_else(|| base.resource_group.clone());
    job.coverage = overlay.coverage.clone().or_else(|| base.coverage.clone());
    job.dependencies = overlay
        .dependencies
        .clone()
        .or_else(|| base.dependencies.clone());
    job.trigger = merge_mapping_field(&base.trigger, &overlay.trigger, Trigger::merged_with);
    job.variables = merge_mapping_field(&base.variables, &overlay.variables, Variables::merged_with);

    job
}

/// Mapping-field merge lift: key-wise merge when both sides are set,
/// otherwise whichever side is
fn merge_mapping_field<T: Clone>(
    base: &Option<T>,
    overlay: &Option<T>,
    merge: impl Fn(&T, &T) -> T,
) -> Option<T> {
    match (base, overlay) {
        (Some(base), Some(overlay)) => Some(merge(base, overlay)),
        (Some(base), None) => Some(base.clone()),
        (None, overlay) => overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civet_core::model::{CacheKey, When};

    #[test]
    fn test_scalar_child_wins() {
        let base = Job::new(".base").with_stage("build");
        let mut child = Job::new("job").with_stage("deploy");
        child.when = Some(When::Manual);

        let merged = merge_job(&base, &child);
        assert_eq!(merged.stage.as_deref(), Some("deploy"));
        assert_eq!(merged.when, Some(When::Manual));
    }

    #[test]
    fn test_sequence_replaced_wholesale() {
        let base = Job::new(".base").with_script(vec!["a".into(), "b".into()]);
        let child = Job::new("job").with_script(vec!["c".into()]);

        let merged = merge_job(&base, &child);
        assert_eq!(merged.script, Some(vec!["c".to_string()]));
    }

    #[test]
    fn test_variables_merged_per_key() {
        let base = Job::new(".base")
            .with_variables(Variables::new().with("X", "base").with("Y", "base"));
        let child = Job::new("job").with_variables(Variables::new().with("Y", "child"));

        let merged = merge_job(&base, &child);
        let vars = merged.variables.unwrap();
        assert_eq!(vars.get("X").and_then(|v| v.value()), Some("base"));
        assert_eq!(vars.get("Y").and_then(|v| v.value()), Some("child"));
    }

    #[test]
    fn test_cache_merged_per_key() {
        let mut base = Job::new(".base");
        base.cache = Some(
            Cache::new(vec!["target/".to_string()])
                .with_key(CacheKey::Value("base-key".to_string())),
        );
        let mut child = Job::new("job");
        child.cache = Some(Cache::new(vec!["dist/".to_string()]));

        let cache = merge_job(&base, &child).cache.unwrap();
        assert_eq!(cache.paths, vec!["dist/"]);
        assert_eq!(cache.key, Some(CacheKey::Value("base-key".to_string())));
    }
}
