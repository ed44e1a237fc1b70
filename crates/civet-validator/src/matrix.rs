//! Parallel and matrix expansion
//!
//! Rewrites each job carrying a `parallel` specification into its concrete
//! instances. Count expansion produces `name i/N`; matrix expansion produces
//! `name: [v1, v2]` per combination, walking the cross-product column-major
//! so the first declared variable varies slowest.
//!
//! `needs` entries naming an expanded parent are rewritten to name every
//! instance, keeping the dependency graph closed.

use civet_core::diagnostics::{DiagnosticKind, Diagnostics};
use civet_core::model::{
    Job, Matrix, Parallel, Pipeline, Variables, MAX_PARALLEL, MIN_PARALLEL,
};
use std::collections::HashMap;

/// Expands `parallel` specifications across a pipeline
pub struct MatrixExpander;

impl MatrixExpander {
    /// Expand in place, returning the parent-to-instances mapping
    ///
    /// A job with an out-of-range count or a degenerate matrix is reported
    /// and left unexpanded, so downstream checks still see it.
    pub fn expand(pipeline: &mut Pipeline, diags: &mut Diagnostics) -> HashMap<String, Vec<String>> {
        let mut expanded: HashMap<String, Vec<String>> = HashMap::new();
        let jobs = std::mem::take(&mut pipeline.jobs);

        let mut result: Vec<Job> = Vec::new();
        for job in jobs {
            let Some(parallel) = job.parallel.clone() else {
                result.push(job);
                continue;
            };
            if !job.schedulable {
                result.push(job);
                continue;
            }

            let instances = match &parallel {
                Parallel::Count(count) => Self::expand_count(&job, *count, diags),
                Parallel::Matrix(blocks) => Self::expand_matrix(&job, blocks, diags),
            };
            match instances {
                Some(instances) => {
                    log::debug!(
                        "expanded job '{}' into {} instances",
                        job.name,
                        instances.len()
                    );
                    expanded.insert(
                        job.name.clone(),
                        instances.iter().map(|j| j.name.clone()).collect(),
                    );
                    result.extend(instances);
                }
                None => result.push(job),
            }
        }

        for job in result {
            if let Err(err) = pipeline.jobs.insert(job) {
                diags.error(DiagnosticKind::Matrix, "parallel", err.to_string());
            }
        }

        Self::rewrite_needs(pipeline, &expanded);
        expanded
    }

    fn expand_count(job: &Job, count: u32, diags: &mut Diagnostics) -> Option<Vec<Job>> {
        if !(MIN_PARALLEL..=MAX_PARALLEL).contains(&count) {
            diags.error(
                DiagnosticKind::Matrix,
                format!("{}.parallel", job.name),
                format!(
                    "parallel count {count} is out of range, expected {MIN_PARALLEL} to {MAX_PARALLEL}"
                ),
            );
            return None;
        }

        let mut instances = Vec::with_capacity(count as usize);
        for i in 1..=count {
            let mut instance = job.clone();
            instance.name = format!("{} {i}/{count}", job.name);
            instance.parallel = None;
            instances.push(instance);
        }
        Some(instances)
    }

    fn expand_matrix(job: &Job, blocks: &[Matrix], diags: &mut Diagnostics) -> Option<Vec<Job>> {
        let path = format!("{}.parallel.matrix", job.name);
        let mut instances: Vec<Job> = Vec::new();
        let mut degenerate = false;

        for block in blocks {
            if block.combination_count() == 0 {
                diags.error(
                    DiagnosticKind::Matrix,
                    path.clone(),
                    "matrix block expands to zero combinations",
                );
                degenerate = true;
                continue;
            }
            for combination in Combinations::new(block) {
                let values: Vec<&str> = combination.iter().map(|(_, v)| *v).collect();
                let name = format!("{}: [{}]", job.name, values.join(", "));

                if instances.iter().any(|j| j.name == name) {
                    diags.error(
                        DiagnosticKind::Matrix,
                        path.clone(),
                        format!("matrix blocks produce colliding instance '{name}'"),
                    );
                    continue;
                }

                let mut instance = job.clone();
                instance.name = name;
                instance.parallel = None;

                let mut dims = Variables::new();
                for (variable, value) in &combination {
                    dims.set(*variable, *value);
                }
                instance.variables = Some(match &job.variables {
                    Some(base) => base.merged_with(&dims),
                    None => dims,
                });
                instances.push(instance);
            }
        }

        if instances.is_empty() {
            if !degenerate {
                diags.error(DiagnosticKind::Matrix, path, "matrix expands to no instances");
            }
            return None;
        }
        Some(instances)
    }

    /// Point `needs` entries at instances instead of expanded parents
    fn rewrite_needs(pipeline: &mut Pipeline, expanded: &HashMap<String, Vec<String>>) {
        if expanded.is_empty() {
            return;
        }
        for job in pipeline.jobs.iter_mut() {
            let Some(needs) = job.needs.take() else {
                continue;
            };
            let mut rewritten = Vec::with_capacity(needs.len());
            for need in needs {
                match expanded.get(&need.job) {
                    Some(instances) => {
                        for instance in instances {
                            let mut clone = need.clone();
                            clone.job = instance.clone();
                            rewritten.push(clone);
                        }
                    }
                    None => rewritten.push(need),
                }
            }
            job.needs = Some(rewritten);
        }
    }
}

/// Column-major cross-product iterator over one matrix block
///
/// Yields `(variable, value)` pairs in dimension declaration order; the last
/// dimension's index advances fastest.
struct Combinations<'a> {
    block: &'a Matrix,
    indices: Vec<usize>,
    done: bool,
}

impl<'a> Combinations<'a> {
    fn new(block: &'a Matrix) -> Self {
        let done = block.combination_count() == 0;
        Combinations {
            block,
            indices: vec![0; block.dimensions.len()],
            done,
        }
    }
}

impl<'a> Iterator for Combinations<'a> {
    type Item = Vec<(&'a str, &'a str)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let combination: Vec<(&str, &str)> = self
            .block
            .dimensions
            .iter()
            .zip(&self.indices)
            .map(|(dim, &i)| (dim.variable.as_str(), dim.values[i].as_str()))
            .collect();

        // advance from the rightmost dimension
        let mut pos = self.indices.len();
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            self.indices[pos] += 1;
            if self.indices[pos] < self.block.dimensions[pos].values.len() {
                break;
            }
            self.indices[pos] = 0;
        }

        Some(combination)
    }
}
