//! Document parser
//!
//! Walks the top level of a configuration tree and dispatches each key to the
//! entity parser that owns it. Problems inside one entity are recorded as
//! diagnostics and that entity is skipped; only an unusable document root
//! fails the parse outright.

use crate::error::{ParseError, Result};
use crate::include::IncludeParser;
use crate::job::JobParser;
use crate::norm;
use crate::rules::RulesParser;
use crate::yaml::Yaml;
use civet_core::diagnostics::{DiagnosticKind, Diagnostics};
use civet_core::error::ModelError;
use civet_core::model::{DefaultTemplate, Pipeline, Workflow};
use serde_yaml::Value;

/// Top-level keys that are configuration, not jobs
const GLOBAL_KEYS: &[&str] = &[
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

/// Document parser
pub struct DocumentParser;

impl DocumentParser {
    /// Parse YAML source into an unresolved pipeline plus diagnostics
    pub fn parse_str(source: &str) -> Result<(Pipeline, Diagnostics)> {
        let tree: Value = serde_yaml::from_str(source)?;
        Self::parse(&tree)
    }

    /// Parse a generic document tree into an unresolved pipeline
    ///
    /// Every key that is not a recognized global keyword is treated as a job
    /// or hidden template. A job that fails to parse is dropped with an error
    /// diagnostic; the rest of the document still goes through.
    pub fn parse(tree: &Value) -> Result<(Pipeline, Diagnostics)> {
        let root = tree
            .as_mapping()
            .ok_or_else(|| ParseError::Document(format!(
                "configuration root must be a mapping, found {}",
                Yaml::type_name(tree)
            )))?;

        log::debug!("parsing document with {} top-level keys", root.len());
        let mut pipeline = Pipeline::new();
        let mut diags = Diagnostics::new();

        if let Some(stages) = tree.get("stages") {
            match norm::string_or_list(stages, "stages") {
                Ok(names) => {
                    for name in names {
                        if let Err(ModelError::DuplicateStage(dup)) = pipeline.add_stage(name) {
                            diags.error(
                                DiagnosticKind::Uniqueness,
                                "stages",
                                format!("stage '{dup}' is declared more than once"),
                            );
                        }
                    }
                }
                Err(err) => Self::record(&mut diags, err),
            }
        }

        if let Some(vars) = tree.get("variables") {
            match RulesParser::parse_variables(vars, "variables") {
                Ok(parsed) => pipeline.variables = parsed,
                Err(err) => Self::record(&mut diags, err),
            }
        }

        if let Some(workflow) = tree.get("workflow") {
            match Self::parse_workflow(workflow) {
                Ok(parsed) => pipeline.workflow = Some(parsed),
                Err(err) => Self::record(&mut diags, err),
            }
        }

        if let Some(include) = tree.get("include") {
            match IncludeParser::parse(include, "include") {
                Ok(includes) => pipeline.includes = includes,
                Err(err) => Self::record(&mut diags, err),
            }
        }

        match Self::parse_defaults(tree, &mut diags) {
            Ok(default) if !default.is_empty() => pipeline.default = Some(default),
            Ok(_) => {}
            Err(err) => Self::record(&mut diags, err),
        }

        for (key, value) in root {
            let name = match key.as_str() {
                Some(name) => name,
                None => {
                    diags.error(
                        DiagnosticKind::Shape,
                        "<root>",
                        format!("job names must be strings, found {}", Yaml::type_name(key)),
                    );
                    continue;
                }
            };
            if GLOBAL_KEYS.contains(&name) {
                continue;
            }
            if name.is_empty() {
                diags.error(
                    DiagnosticKind::Shape,
                    "<root>",
                    "job names must not be empty",
                );
                continue;
            }

            let job = match JobParser::parse(name, value, &mut diags) {
                Ok(job) => job,
                Err(err) => {
                    Self::record(&mut diags, err);
                    continue;
                }
            };
            if let Err(err) = pipeline.add_job(job) {
                // Reserved names are filtered above and YAML mappings
                // deduplicate keys, so this only fires on programmatic trees.
                let kind = match err {
                    ModelError::DuplicateJob(_) => DiagnosticKind::Uniqueness,
                    _ => DiagnosticKind::Shape,
                };
                diags.error(kind, name, err.to_string());
            }
        }

        log::debug!(
            "parsed {} jobs with {} diagnostics",
            pipeline.jobs.len(),
            diags.len()
        );
        Ok((pipeline, diags))
    }

    fn parse_workflow(value: &Value) -> Result<Workflow> {
        Yaml::as_mapping(value, "workflow")?;
        let rules = match value.get("rules") {
            Some(rules) => RulesParser::parse_rules(rules, "workflow.rules")?,
            None => Vec::new(),
        };
        let mut workflow = Workflow::new(rules);
        workflow.name = Yaml::get_optional_string(value, "name");
        Ok(workflow)
    }

    /// The `default:` block, plus legacy top-level keywords folded into it
    ///
    /// `image`, `services`, `cache`, `before_script`, and `after_script` at
    /// the document root are the older spelling of the same defaults; an
    /// explicit `default:` entry wins over its legacy twin.
    fn parse_defaults(tree: &Value, diags: &mut Diagnostics) -> Result<DefaultTemplate> {
        let mut default = match tree.get("default") {
            Some(block) => JobParser::parse_default(block, diags)?,
            None => DefaultTemplate::new(),
        };

        let mut legacy = serde_yaml::Mapping::new();
        for key in ["image", "services", "cache", "before_script", "after_script"] {
            if let Some(value) = tree.get(key) {
                legacy.insert(Value::String(key.to_string()), value.clone());
            }
        }
        if legacy.is_empty() {
            return Ok(default);
        }

        let legacy = JobParser::parse_default(&Value::Mapping(legacy), diags)?;
        if default.image.is_none() {
            default.image = legacy.image;
        }
        if default.services.is_none() {
            default.services = legacy.services;
        }
        if default.cache.is_none() {
            default.cache = legacy.cache;
        }
        if default.before_script.is_none() {
            default.before_script = legacy.before_script;
        }
        if default.after_script.is_none() {
            default.after_script = legacy.after_script;
        }
        Ok(default)
    }

    fn record(diags: &mut Diagnostics, err: ParseError) {
        let path = err.path().unwrap_or("<root>").to_string();
        diags.error(err.diagnostic_kind(), path, err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civet_core::model::IncludeRef;

    fn parse(source: &str) -> (Pipeline, Diagnostics) {
        DocumentParser::parse_str(source).unwrap()
    }

    #[test]
    fn test_basic_document() {
        let (pipeline, diags) = parse(
            r#"
stages: [build, test]
variables:
  LEVEL: "1"
build-job:
  stage: build
  script: make
test-job:
  stage: test
  script: make check
"#,
        );
        assert!(!diags.has_errors());
        assert_eq!(pipeline.stages, vec!["build", "test"]);
        assert_eq!(pipeline.jobs.len(), 2);
        assert!(pipeline.jobs.contains("build-job"));
    }

    #[test]
    fn test_non_mapping_root_is_fatal() {
        let err = DocumentParser::parse_str("- a\n- b\n").unwrap_err();
        assert!(matches!(err, ParseError::Document(_)));
    }

    #[test]
    fn test_duplicate_stage_keeps_going() {
        let (pipeline, diags) = parse("stages: [build, build, test]\nj:\n  script: x\n");
        assert_eq!(pipeline.stages, vec!["build", "test"]);
        assert_eq!(diags.iter().filter(|d| d.kind == DiagnosticKind::Uniqueness).count(), 1);
        assert!(pipeline.jobs.contains("j"));
    }

    #[test]
    fn test_broken_job_skipped_others_kept() {
        let (pipeline, diags) = parse(
            r#"
good:
  script: make
bad:
  script:
    nested: map
"#,
        );
        assert!(pipeline.jobs.contains("good"));
        assert!(!pipeline.jobs.contains("bad"));
        assert!(diags.has_errors());
    }

    #[test]
    fn test_hidden_templates_collected() {
        let (pipeline, diags) = parse(".base:\n  image: alpine\nj:\n  extends: .base\n  script: x\n");
        assert!(!diags.has_errors());
        let base = pipeline.jobs.get(".base").unwrap();
        assert!(!base.schedulable);
        assert_eq!(
            pipeline.jobs.get("j").unwrap().extends,
            vec![".base".to_string()]
        );
    }

    #[test]
    fn test_workflow_block() {
        let (pipeline, diags) = parse(
            r#"
workflow:
  name: nightly
  rules:
    - if: '$CI_PIPELINE_SOURCE == "schedule"'
j:
  script: x
"#,
        );
        assert!(!diags.has_errors());
        let workflow = pipeline.workflow.unwrap();
        assert_eq!(workflow.name.as_deref(), Some("nightly"));
        assert_eq!(workflow.rules.len(), 1);
    }

    #[test]
    fn test_include_directives() {
        let (pipeline, diags) = parse("include:\n  - local: /ci/common.yml\nj:\n  script: x\n");
        assert!(!diags.has_errors());
        assert_eq!(pipeline.includes.len(), 1);
        assert!(matches!(
            pipeline.includes[0].reference,
            IncludeRef::Local(ref p) if p == "/ci/common.yml"
        ));
    }

    #[test]
    fn test_legacy_top_level_defaults_folded() {
        let (pipeline, diags) = parse(
            r#"
image: rust:1.80
before_script: [rustup show]
default:
  image: alpine
j:
  script: x
"#,
        );
        assert!(!diags.has_errors());
        let default = pipeline.default.unwrap();
        assert_eq!(default.image.as_deref(), Some("alpine"));
        assert_eq!(
            default.before_script,
            Some(vec!["rustup show".to_string()])
        );
    }
}
