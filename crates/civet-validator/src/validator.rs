//! Validation pipeline
//!
//! Runs the full phase sequence over one document: include composition,
//! parsing, template resolution, default application, structural rule
//! checks, parallel expansion, and dependency validation. Each phase records
//! what it finds and hands the document on, so one pass reports everything
//! at once; only an unusable document root aborts early.

use crate::dag::{DependencyValidator, JobGraph};
use crate::error::Result;
use crate::extends::TemplateResolver;
use crate::include::{FragmentComposer, IncludeResolver};
use crate::matrix::MatrixExpander;
use crate::rules::RuleChecker;
use civet_core::diagnostics::Diagnostics;
use civet_core::model::Pipeline;
use civet_parser::DocumentParser;
use serde_yaml::Value;

/// Validation knobs
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatorOptions {
    /// Ignore stage ordering; `needs` alone defines execution order
    pub dag_mode: bool,

    /// Treat warnings as failures in [`ValidatedPipeline::is_valid`]
    pub strict: bool,
}

/// The outcome of one validation pass
#[derive(Debug)]
pub struct ValidatedPipeline {
    /// Fully resolved model: extends flattened, defaults applied, parallel
    /// jobs expanded
    pub pipeline: Pipeline,

    /// Dependency graph over the expanded jobs
    pub graph: JobGraph,

    /// Everything found along the way, in phase order
    pub diagnostics: Diagnostics,

    strict: bool,
}

impl ValidatedPipeline {
    /// True if the document passed validation
    pub fn is_valid(&self) -> bool {
        if self.strict {
            self.diagnostics.len() == 0
        } else {
            !self.diagnostics.has_errors()
        }
    }
}

/// Entry point for validating CI configuration documents
pub struct Validator {
    options: ValidatorOptions,
}

impl Validator {
    pub fn new(options: ValidatorOptions) -> Self {
        Validator { options }
    }

    /// Validate YAML source with no include resolution
    ///
    /// Include directives in the document are retained on the model but not
    /// fetched; use [`Validator::validate_str_with_includes`] to compose them.
    pub fn validate_str(&self, source: &str) -> Result<ValidatedPipeline> {
        let tree: Value = serde_yaml::from_str(source).map_err(civet_parser::ParseError::from)?;
        self.validate_tree(&tree)
    }

    /// Validate YAML source, composing includes through `resolver`
    pub fn validate_str_with_includes(
        &self,
        source: &str,
        resolver: &mut dyn IncludeResolver,
    ) -> Result<ValidatedPipeline> {
        let tree: Value = serde_yaml::from_str(source).map_err(civet_parser::ParseError::from)?;
        self.validate_tree_with_includes(&tree, resolver)
    }

    /// Validate a generic document tree with no include resolution
    pub fn validate_tree(&self, tree: &Value) -> Result<ValidatedPipeline> {
        let (pipeline, diags) = DocumentParser::parse(tree)?;
        Ok(self.run_phases(pipeline, diags))
    }

    /// Validate a generic document tree, composing includes first
    pub fn validate_tree_with_includes(
        &self,
        tree: &Value,
        resolver: &mut dyn IncludeResolver,
    ) -> Result<ValidatedPipeline> {
        let mut diags = Diagnostics::new();
        let composed = FragmentComposer::new().compose(tree, resolver, &mut diags);

        let (pipeline, parse_diags) = DocumentParser::parse(&composed)?;
        diags.absorb(parse_diags);
        Ok(self.run_phases(pipeline, diags))
    }

    /// Validate an already-built pipeline, skipping the parse phase
    ///
    /// This is the path for programmatic construction: the model builders
    /// enforce name uniqueness at insertion time, and everything else is
    /// checked here.
    pub fn validate_pipeline(&self, pipeline: Pipeline) -> ValidatedPipeline {
        self.run_phases(pipeline, Diagnostics::new())
    }

    fn run_phases(&self, mut pipeline: Pipeline, mut diags: Diagnostics) -> ValidatedPipeline {
        log::debug!("resolving templates for {} jobs", pipeline.jobs.len());
        TemplateResolver::new().resolve_pipeline(&mut pipeline, &mut diags);

        if let Some(default) = pipeline.default.clone() {
            for job in pipeline.jobs.iter_mut() {
                default.apply_to(job);
            }
        }

        RuleChecker::check_pipeline(&pipeline, &mut diags);

        log::debug!("expanding parallel specifications");
        MatrixExpander::expand(&mut pipeline, &mut diags);

        log::debug!("validating dependency graph");
        let graph = DependencyValidator::new(self.options.dag_mode).validate(&pipeline, &mut diags);

        ValidatedPipeline {
            pipeline,
            graph,
            diagnostics: diags,
            strict: self.options.strict,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Validator::new(ValidatorOptions::default())
    }
}
