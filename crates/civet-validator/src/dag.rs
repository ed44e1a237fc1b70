//! Dependency validation
//!
//! Builds the `needs` graph over schedulable jobs and checks it: every
//! referenced job must exist, a needed job must not run in a later stage than
//! the dependent, and the graph must be acyclic. Stage membership is checked
//! here too since both checks read the same stage indices.

use crate::error::ValidateError;
use civet_core::diagnostics::{DiagnosticKind, Diagnostics};
use civet_core::model::Pipeline;
use std::collections::BTreeMap;

/// The `needs` graph: job name to the names it depends on
///
/// Only edges between jobs that actually exist are kept; dangling references
/// are reported during validation and never enter the graph.
#[derive(Debug, Default, Clone)]
pub struct JobGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl JobGraph {
    /// Dependencies of one job, in declaration order
    pub fn needs_of(&self, name: &str) -> &[String] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Job names present in the graph, sorted
    pub fn jobs(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// First dependency cycle, as the closed chain of job names
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            graph: &BTreeMap<String, Vec<String>>,
            node: &str,
            marks: &mut BTreeMap<String, Mark>,
            path: &mut Vec<String>,
        ) -> Option<Vec<String>> {
            match marks.get(node) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|p| p == node).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].to_vec();
                    cycle.push(node.to_string());
                    return Some(cycle);
                }
                None => {}
            }

            marks.insert(node.to_string(), Mark::Visiting);
            path.push(node.to_string());
            if let Some(needs) = graph.get(node) {
                for need in needs {
                    if let Some(cycle) = visit(graph, need, marks, path) {
                        return Some(cycle);
                    }
                }
            }
            path.pop();
            marks.insert(node.to_string(), Mark::Done);
            None
        }

        let mut marks = BTreeMap::new();
        let mut path = Vec::new();
        for node in self.edges.keys() {
            if let Some(cycle) = visit(&self.edges, node, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
        None
    }
}

/// Validates stages and the `needs` graph of a resolved pipeline
pub struct DependencyValidator {
    /// Skip the stage-order check; `needs` alone defines execution order
    dag_mode: bool,
}

impl DependencyValidator {
    pub fn new(dag_mode: bool) -> Self {
        DependencyValidator { dag_mode }
    }

    /// Check every schedulable job and return the dependency graph
    pub fn validate(&self, pipeline: &Pipeline, diags: &mut Diagnostics) -> JobGraph {
        let mut graph = JobGraph::default();

        for job in pipeline.jobs.schedulable() {
            let stage = pipeline.effective_stage(job);
            let stage_index = pipeline.stage_index(stage);
            if stage_index.is_none() {
                let err = ValidateError::UnknownStage {
                    job: job.name.clone(),
                    stage: stage.to_string(),
                };
                diags.error(err.diagnostic_kind(), &job.name, err.to_string());
            }

            let mut edges = Vec::new();
            for need in job.needs.as_deref().unwrap_or_default() {
                let target = match pipeline.jobs.get(&need.job) {
                    Some(target) if target.schedulable => target,
                    _ if need.optional => continue,
                    _ => {
                        let err = ValidateError::UnknownNeed {
                            job: job.name.clone(),
                            reference: need.job.clone(),
                        };
                        diags.error(
                            err.diagnostic_kind(),
                            format!("{}.needs", job.name),
                            err.to_string(),
                        );
                        continue;
                    }
                };

                if !self.dag_mode {
                    let needed_stage = pipeline.effective_stage(target);
                    if let (Some(job_idx), Some(needed_idx)) =
                        (stage_index, pipeline.stage_index(needed_stage))
                    {
                        if needed_idx > job_idx {
                            let err = ValidateError::StageOrder {
                                job: job.name.clone(),
                                job_stage: stage.to_string(),
                                needed: need.job.clone(),
                                needed_stage: needed_stage.to_string(),
                            };
                            diags.error(
                                err.diagnostic_kind(),
                                format!("{}.needs", job.name),
                                err.to_string(),
                            );
                        }
                    }
                }
                edges.push(need.job.clone());
            }
            graph.edges.insert(job.name.clone(), edges);
        }

        if let Some(chain) = graph.find_cycle() {
            let err = ValidateError::NeedsCycle { chain };
            diags.error(DiagnosticKind::Dependency, "needs", err.to_string());
        }

        graph
    }
}
