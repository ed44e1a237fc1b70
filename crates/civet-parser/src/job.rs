//! Job parser
//!
//! Parses one job-shaped mapping (a real job, a hidden template, or the
//! `default:` block) into its typed entity.

use crate::error::{ParseError, Result};
use crate::norm::{self, ScalarOrMapping};
use crate::rules::RulesParser;
use crate::yaml::Yaml;
use civet_core::diagnostics::{DiagnosticKind, Diagnostics};
use civet_core::model::{
    Artifacts, ArtifactsWhen, Cache, CacheKey, CachePolicy, DefaultTemplate, Environment,
    EnvironmentAction, Job, Matrix, MatrixDimension, Need, Parallel, Retry, Service, Trigger,
    MAX_RETRY,
};
use serde_yaml::Value;

/// Fields recognized on a job
const JOB_FIELDS: &[&str] = &[
    "stage",
    "extends",
    "image",
    "script",
    "before_script",
    "after_script",
    "needs",
    "rules",
    "only",
    "except",
    "variables",
    "cache",
    "artifacts",
    "environment",
    "services",
    "parallel",
    "when",
    "allow_failure",
    "tags",
    "timeout",
    "retry",
    "interruptible",
    "resource_group",
    "coverage",
    "dependencies",
    "trigger",
];

/// Fields recognized inside the `default:` block
const DEFAULT_FIELDS: &[&str] = &[
    "image",
    "services",
    "cache",
    "artifacts",
    "before_script",
    "after_script",
    "tags",
    "retry",
    "interruptible",
    "timeout",
];

/// Job parser
pub struct JobParser;

impl JobParser {
    /// Parse a job-shaped mapping into a [`Job`]
    ///
    /// Unknown fields are recorded as warnings; a field with an unusable
    /// shape fails the whole job.
    pub fn parse(name: &str, value: &Value, diags: &mut Diagnostics) -> Result<Job> {
        Yaml::as_mapping(value, name)?;

        for warning in Yaml::unknown_fields(value, JOB_FIELDS, name) {
            diags.warning(DiagnosticKind::Shape, name, warning);
        }

        let mut job = Job::new(name);

        if let Some(stage) = value.get("stage") {
            job.stage = Some(norm::scalar_string(stage, &Yaml::join(name, "stage"))?);
        }
        if let Some(extends) = value.get("extends") {
            job.extends = norm::string_or_list(extends, &Yaml::join(name, "extends"))?;
        }
        if let Some(image) = value.get("image") {
            job.image = Some(Self::parse_image(image, &Yaml::join(name, "image"))?);
        }
        if let Some(script) = value.get("script") {
            job.script = Some(norm::string_or_list(script, &Yaml::join(name, "script"))?);
        }
        if let Some(before) = value.get("before_script") {
            job.before_script = Some(norm::string_or_list(
                before,
                &Yaml::join(name, "before_script"),
            )?);
        }
        if let Some(after) = value.get("after_script") {
            job.after_script = Some(norm::string_or_list(
                after,
                &Yaml::join(name, "after_script"),
            )?);
        }
        if let Some(needs) = value.get("needs") {
            job.needs = Some(Self::parse_needs(needs, &Yaml::join(name, "needs"))?);
        }
        if let Some(rules) = value.get("rules") {
            job.rules = Some(RulesParser::parse_rules(rules, &Yaml::join(name, "rules"))?);
        }
        if let Some(only) = value.get("only") {
            job.only = Some(RulesParser::parse_only_except(
                only,
                &Yaml::join(name, "only"),
            )?);
        }
        if let Some(except) = value.get("except") {
            job.except = Some(RulesParser::parse_only_except(
                except,
                &Yaml::join(name, "except"),
            )?);
        }
        if let Some(vars) = value.get("variables") {
            job.variables = Some(RulesParser::parse_variables(
                vars,
                &Yaml::join(name, "variables"),
            )?);
        }
        if let Some(cache) = value.get("cache") {
            job.cache = Some(Self::parse_cache(cache, &Yaml::join(name, "cache"))?);
        }
        if let Some(artifacts) = value.get("artifacts") {
            job.artifacts = Some(Self::parse_artifacts(
                artifacts,
                &Yaml::join(name, "artifacts"),
            )?);
        }
        if let Some(env) = value.get("environment") {
            job.environment = Some(Self::parse_environment(
                env,
                &Yaml::join(name, "environment"),
            )?);
        }
        if let Some(services) = value.get("services") {
            job.services = Some(Self::parse_services(
                services,
                &Yaml::join(name, "services"),
            )?);
        }
        if let Some(parallel) = value.get("parallel") {
            job.parallel = Some(Self::parse_parallel(
                parallel,
                &Yaml::join(name, "parallel"),
            )?);
        }
        if let Some(when) = value.get("when") {
            job.when = Some(RulesParser::parse_when(when, &Yaml::join(name, "when"))?);
        }
        if let Some(af) = value.get("allow_failure") {
            job.allow_failure = Some(RulesParser::parse_allow_failure(
                af,
                &Yaml::join(name, "allow_failure"),
            )?);
        }
        if let Some(tags) = value.get("tags") {
            job.tags = Some(norm::string_or_list(tags, &Yaml::join(name, "tags"))?);
        }
        if let Some(timeout) = value.get("timeout") {
            job.timeout = Some(norm::scalar_string(timeout, &Yaml::join(name, "timeout"))?);
        }
        if let Some(retry) = value.get("retry") {
            job.retry = Some(Self::parse_retry(retry, &Yaml::join(name, "retry"))?);
        }
        if let Some(interruptible) = Yaml::get_optional_bool(value, "interruptible") {
            job.interruptible = Some(interruptible);
        }
        if let Some(rg) = value.get("resource_group") {
            job.resource_group = Some(norm::scalar_string(
                rg,
                &Yaml::join(name, "resource_group"),
            )?);
        }
        if let Some(coverage) = value.get("coverage") {
            job.coverage = Some(norm::scalar_string(coverage, &Yaml::join(name, "coverage"))?);
        }
        if let Some(deps) = value.get("dependencies") {
            job.dependencies = Some(norm::string_or_list(
                deps,
                &Yaml::join(name, "dependencies"),
            )?);
        }
        if let Some(trigger) = value.get("trigger") {
            job.trigger = Some(Self::parse_trigger(trigger, &Yaml::join(name, "trigger"))?);
        }

        Ok(job)
    }

    /// Parse the global `default:` block
    pub fn parse_default(value: &Value, diags: &mut Diagnostics) -> Result<DefaultTemplate> {
        Yaml::as_mapping(value, "default")?;

        for warning in Yaml::unknown_fields(value, DEFAULT_FIELDS, "default") {
            diags.warning(DiagnosticKind::Shape, "default", warning);
        }

        let mut default = DefaultTemplate::new();

        if let Some(image) = value.get("image") {
            default.image = Some(Self::parse_image(image, "default.image")?);
        }
        if let Some(services) = value.get("services") {
            default.services = Some(Self::parse_services(services, "default.services")?);
        }
        if let Some(cache) = value.get("cache") {
            default.cache = Some(Self::parse_cache(cache, "default.cache")?);
        }
        if let Some(artifacts) = value.get("artifacts") {
            default.artifacts = Some(Self::parse_artifacts(artifacts, "default.artifacts")?);
        }
        if let Some(before) = value.get("before_script") {
            default.before_script = Some(norm::string_or_list(before, "default.before_script")?);
        }
        if let Some(after) = value.get("after_script") {
            default.after_script = Some(norm::string_or_list(after, "default.after_script")?);
        }
        if let Some(tags) = value.get("tags") {
            default.tags = Some(norm::string_or_list(tags, "default.tags")?);
        }
        if let Some(retry) = value.get("retry") {
            default.retry = Some(Self::parse_retry(retry, "default.retry")?);
        }
        if let Some(interruptible) = Yaml::get_optional_bool(value, "interruptible") {
            default.interruptible = Some(interruptible);
        }
        if let Some(timeout) = value.get("timeout") {
            default.timeout = Some(norm::scalar_string(timeout, "default.timeout")?);
        }

        Ok(default)
    }

    /// Image: a name string or an object with `name` (entrypoint ignored)
    fn parse_image(value: &Value, path: &str) -> Result<String> {
        match norm::scalar_or_mapping(value, path)? {
            ScalarOrMapping::Scalar(s) => Ok(s),
            ScalarOrMapping::Mapping(_) => Yaml::get_string(value, path, "name"),
        }
    }

    /// Needs: a list of job names or `{job, optional, artifacts}` objects
    fn parse_needs(value: &Value, path: &str) -> Result<Vec<Need>> {
        let items = value.as_sequence().ok_or_else(|| ParseError::Shape {
            path: path.to_string(),
            expected: "a list of job names or need objects".to_string(),
            actual: Yaml::type_name(value).to_string(),
        })?;

        let mut needs = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let item_path = format!("{path}[{i}]");
            match item {
                Value::String(s) => needs.push(Need::new(s.clone())),
                Value::Mapping(_) => {
                    let mut need = Need::new(Yaml::get_string(item, &item_path, "job")?);
                    if let Some(optional) = Yaml::get_optional_bool(item, "optional") {
                        need.optional = optional;
                    }
                    if let Some(artifacts) = Yaml::get_optional_bool(item, "artifacts") {
                        need.artifacts = artifacts;
                    }
                    needs.push(need);
                }
                other => {
                    return Err(ParseError::Shape {
                        path: item_path,
                        expected: "a job name or a need object".to_string(),
                        actual: Yaml::type_name(other).to_string(),
                    })
                }
            }
        }
        Ok(needs)
    }

    /// Cache configuration
    fn parse_cache(value: &Value, path: &str) -> Result<Cache> {
        Yaml::as_mapping(value, path)?;
        let mut cache = Cache::default();

        if let Some(key) = value.get("key") {
            let key_path = Yaml::join(path, "key");
            cache.key = Some(match norm::scalar_or_mapping(key, &key_path)? {
                ScalarOrMapping::Scalar(s) => CacheKey::Value(s),
                ScalarOrMapping::Mapping(_) => {
                    let files = key.get("files").ok_or_else(|| ParseError::MissingField {
                        path: Yaml::join(&key_path, "files"),
                    })?;
                    CacheKey::Files {
                        files: norm::string_or_list(files, &Yaml::join(&key_path, "files"))?,
                        prefix: Yaml::get_optional_string(key, "prefix"),
                    }
                }
            });
        }
        if let Some(paths) = value.get("paths") {
            cache.paths = norm::string_or_list(paths, &Yaml::join(path, "paths"))?;
        }
        if let Some(policy) = value.get("policy") {
            let policy_path = Yaml::join(path, "policy");
            cache.policy = Some(match norm::scalar_string(policy, &policy_path)?.as_str() {
                "pull" => CachePolicy::Pull,
                "push" => CachePolicy::Push,
                "pull-push" => CachePolicy::PullPush,
                other => {
                    return Err(ParseError::InvalidValue {
                        path: policy_path,
                        message: format!(
                            "unrecognized cache policy '{other}', expected pull, push, or pull-push"
                        ),
                    })
                }
            });
        }
        if let Some(when) = value.get("when") {
            cache.when = Some(norm::scalar_string(when, &Yaml::join(path, "when"))?);
        }
        if let Some(untracked) = Yaml::get_optional_bool(value, "untracked") {
            cache.untracked = Some(untracked);
        }

        Ok(cache)
    }

    /// Artifact configuration
    fn parse_artifacts(value: &Value, path: &str) -> Result<Artifacts> {
        Yaml::as_mapping(value, path)?;
        let mut artifacts = Artifacts::default();

        if let Some(paths) = value.get("paths") {
            artifacts.paths = norm::string_or_list(paths, &Yaml::join(path, "paths"))?;
        }
        if let Some(exclude) = value.get("exclude") {
            artifacts.exclude = norm::string_or_list(exclude, &Yaml::join(path, "exclude"))?;
        }
        artifacts.expire_in = Yaml::get_optional_string(value, "expire_in");
        artifacts.expose_as = Yaml::get_optional_string(value, "expose_as");
        artifacts.name = Yaml::get_optional_string(value, "name");

        if let Some(when) = value.get("when") {
            let when_path = Yaml::join(path, "when");
            artifacts.when = Some(match norm::scalar_string(when, &when_path)?.as_str() {
                "on_success" => ArtifactsWhen::OnSuccess,
                "on_failure" => ArtifactsWhen::OnFailure,
                "always" => ArtifactsWhen::Always,
                other => {
                    return Err(ParseError::InvalidValue {
                        path: when_path,
                        message: format!(
                            "unrecognized artifacts condition '{other}', expected on_success, on_failure, or always"
                        ),
                    })
                }
            });
        }
        if let Some(reports) = value.get("reports") {
            let obj = Yaml::as_mapping(reports, &Yaml::join(path, "reports"))?;
            let mut map = std::collections::BTreeMap::new();
            for (k, v) in obj {
                if let Some(name) = k.as_str() {
                    map.insert(name.to_string(), v.clone());
                }
            }
            artifacts.reports = Some(map);
        }

        Ok(artifacts)
    }

    /// Environment: a name string or a structured object
    fn parse_environment(value: &Value, path: &str) -> Result<Environment> {
        match norm::scalar_or_mapping(value, path)? {
            ScalarOrMapping::Scalar(name) => Ok(Environment::new(name)),
            ScalarOrMapping::Mapping(_) => {
                let mut env = Environment::new(Yaml::get_string(value, path, "name")?);
                env.url = Yaml::get_optional_string(value, "url");
                env.on_stop = Yaml::get_optional_string(value, "on_stop");
                env.deployment_tier = Yaml::get_optional_string(value, "deployment_tier");
                if let Some(action) = value.get("action") {
                    let action_path = Yaml::join(path, "action");
                    env.action = Some(match norm::scalar_string(action, &action_path)?.as_str() {
                        "start" => EnvironmentAction::Start,
                        "prepare" => EnvironmentAction::Prepare,
                        "stop" => EnvironmentAction::Stop,
                        "verify" => EnvironmentAction::Verify,
                        "access" => EnvironmentAction::Access,
                        other => {
                            return Err(ParseError::InvalidValue {
                                path: action_path,
                                message: format!("unrecognized environment action '{other}'"),
                            })
                        }
                    });
                }
                Ok(env)
            }
        }
    }

    /// Services: a list of image names or structured objects
    fn parse_services(value: &Value, path: &str) -> Result<Vec<Service>> {
        let items = value.as_sequence().ok_or_else(|| ParseError::Shape {
            path: path.to_string(),
            expected: "a list of service names or objects".to_string(),
            actual: Yaml::type_name(value).to_string(),
        })?;

        let mut services = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let item_path = format!("{path}[{i}]");
            match norm::scalar_or_mapping(item, &item_path)? {
                ScalarOrMapping::Scalar(name) => services.push(Service::new(name)),
                ScalarOrMapping::Mapping(_) => {
                    let mut service = Service::new(Yaml::get_string(item, &item_path, "name")?);
                    service.alias = Yaml::get_optional_string(item, "alias");
                    if let Some(entrypoint) = item.get("entrypoint") {
                        service.entrypoint = Some(norm::string_or_list(
                            entrypoint,
                            &Yaml::join(&item_path, "entrypoint"),
                        )?);
                    }
                    if let Some(command) = item.get("command") {
                        service.command = Some(norm::string_or_list(
                            command,
                            &Yaml::join(&item_path, "command"),
                        )?);
                    }
                    services.push(service);
                }
            }
        }
        Ok(services)
    }

    /// Parallel: a plain count or `{matrix: [...]}`
    ///
    /// Count bounds and matrix degeneracy are checked by the expander, not
    /// here, so unrelated problems in the same document still surface.
    fn parse_parallel(value: &Value, path: &str) -> Result<Parallel> {
        match value {
            Value::Number(n) => {
                let count = n.as_u64().ok_or_else(|| ParseError::InvalidValue {
                    path: path.to_string(),
                    message: "parallel count must be a non-negative integer".to_string(),
                })?;
                Ok(Parallel::Count(count.min(u32::MAX as u64) as u32))
            }
            Value::Mapping(_) => {
                let matrix = value.get("matrix").ok_or_else(|| ParseError::MissingField {
                    path: Yaml::join(path, "matrix"),
                })?;
                let matrix_path = Yaml::join(path, "matrix");
                let blocks = matrix.as_sequence().ok_or_else(|| ParseError::Shape {
                    path: matrix_path.clone(),
                    expected: "a list of variable-combination objects".to_string(),
                    actual: Yaml::type_name(matrix).to_string(),
                })?;

                let mut parsed = Vec::with_capacity(blocks.len());
                for (i, block) in blocks.iter().enumerate() {
                    let block_path = format!("{matrix_path}[{i}]");
                    let obj = Yaml::as_mapping(block, &block_path)?;

                    let mut dimensions = Vec::with_capacity(obj.len());
                    for (k, v) in obj {
                        let variable = k.as_str().ok_or_else(|| ParseError::Shape {
                            path: block_path.clone(),
                            expected: "string variable names".to_string(),
                            actual: Yaml::type_name(k).to_string(),
                        })?;
                        let values =
                            norm::string_or_list(v, &Yaml::join(&block_path, variable))?;
                        dimensions.push(MatrixDimension::new(variable, values));
                    }
                    parsed.push(Matrix::new(dimensions));
                }
                Ok(Parallel::Matrix(parsed))
            }
            other => Err(ParseError::Shape {
                path: path.to_string(),
                expected: "an integer or an object with 'matrix'".to_string(),
                actual: Yaml::type_name(other).to_string(),
            }),
        }
    }

    /// Retry: a plain count or `{max, when}`; max is capped at 2 upstream
    fn parse_retry(value: &Value, path: &str) -> Result<Retry> {
        let check_max = |max: u64, path: &str| -> Result<u8> {
            if max > MAX_RETRY as u64 {
                return Err(ParseError::InvalidValue {
                    path: path.to_string(),
                    message: format!("retry max must be between 0 and {MAX_RETRY}"),
                });
            }
            Ok(max as u8)
        };

        match value {
            Value::Number(n) => {
                let max = n.as_u64().ok_or_else(|| ParseError::InvalidValue {
                    path: path.to_string(),
                    message: "retry count must be a non-negative integer".to_string(),
                })?;
                Ok(Retry::Max(check_max(max, path)?))
            }
            Value::Mapping(_) => {
                let max_path = Yaml::join(path, "max");
                let max = Yaml::get_optional_u64(value, "max").ok_or_else(|| {
                    ParseError::MissingField {
                        path: max_path.clone(),
                    }
                })?;
                let when = match value.get("when") {
                    Some(w) => Some(norm::string_or_list(w, &Yaml::join(path, "when"))?),
                    None => None,
                };
                Ok(Retry::Spec {
                    max: check_max(max, &max_path)?,
                    when,
                })
            }
            other => Err(ParseError::Shape {
                path: path.to_string(),
                expected: "an integer or an object with 'max'".to_string(),
                actual: Yaml::type_name(other).to_string(),
            }),
        }
    }

    /// Trigger: a project path string or a structured object
    fn parse_trigger(value: &Value, path: &str) -> Result<Trigger> {
        match norm::scalar_or_mapping(value, path)? {
            ScalarOrMapping::Scalar(project) => Ok(Trigger::project(project)),
            ScalarOrMapping::Mapping(_) => {
                let trigger = Trigger {
                    project: Yaml::get_optional_string(value, "project"),
                    include: Yaml::get_optional_string(value, "include"),
                    strategy: Yaml::get_optional_string(value, "strategy"),
                };
                if trigger.project.is_none() && trigger.include.is_none() {
                    return Err(ParseError::InvalidValue {
                        path: path.to_string(),
                        message: "trigger must specify 'project' or 'include'".to_string(),
                    });
                }
                Ok(trigger)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civet_core::model::When;

    fn v(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn parse_job(name: &str, yaml: &str) -> Result<Job> {
        let mut diags = Diagnostics::new();
        JobParser::parse(name, &v(yaml), &mut diags)
    }

    #[test]
    fn test_minimal_job() {
        let job = parse_job("build", "script: cargo build").unwrap();
        assert_eq!(job.script, Some(vec!["cargo build".to_string()]));
        assert!(job.schedulable);
        assert!(job.stage.is_none());
    }

    #[test]
    fn test_full_job() {
        let job = parse_job(
            "deploy",
            r#"
stage: deploy
image: alpine:3.20
script:
  - ./deploy.sh
needs:
  - build
  - job: lint
    optional: true
when: manual
tags: [docker]
retry: 2
timeout: 30 minutes
environment:
  name: production
  url: https://example.com
"#,
        )
        .unwrap();

        assert_eq!(job.stage.as_deref(), Some("deploy"));
        assert_eq!(job.image.as_deref(), Some("alpine:3.20"));
        assert_eq!(job.when, Some(When::Manual));
        assert_eq!(job.retry, Some(Retry::Max(2)));

        let needs = job.needs.as_ref().unwrap();
        assert_eq!(needs.len(), 2);
        assert!(!needs[0].optional);
        assert!(needs[1].optional);

        let env = job.environment.as_ref().unwrap();
        assert_eq!(env.name, "production");
        assert_eq!(env.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_hidden_template() {
        let job = parse_job(".base", "variables:\n  LEVEL: '1'").unwrap();
        assert!(!job.schedulable);
    }

    #[test]
    fn test_image_object_form() {
        let job = parse_job("j", "image:\n  name: rust:1.80\nscript: [build]").unwrap();
        assert_eq!(job.image.as_deref(), Some("rust:1.80"));
    }

    #[test]
    fn test_unknown_field_warns_but_parses() {
        let mut diags = Diagnostics::new();
        let job = JobParser::parse("build", &v("script: make\nscripts: oops"), &mut diags).unwrap();
        assert!(job.script.is_some());
        assert_eq!(diags.len(), 1);
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_parallel_count_and_matrix() {
        let job = parse_job("t", "script: [x]\nparallel: 5").unwrap();
        assert_eq!(job.parallel, Some(Parallel::Count(5)));

        let job = parse_job(
            "t",
            "script: [x]\nparallel:\n  matrix:\n    - PROVIDER: [aws, gcp]\n      REGION: us\n",
        )
        .unwrap();
        match job.parallel.unwrap() {
            Parallel::Matrix(blocks) => {
                assert_eq!(blocks.len(), 1);
                assert_eq!(blocks[0].dimensions.len(), 2);
                assert_eq!(blocks[0].dimensions[0].variable, "PROVIDER");
                assert_eq!(blocks[0].dimensions[1].values, vec!["us"]);
            }
            other => panic!("expected matrix, got {other:?}"),
        }
    }

    #[test]
    fn test_retry_out_of_range() {
        let err = parse_job("t", "script: [x]\nretry: 3").unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { .. }));
    }

    #[test]
    fn test_cache_with_file_key() {
        let job = parse_job(
            "t",
            "script: [x]\ncache:\n  key:\n    files: [Cargo.lock]\n  paths: [target/]\n  policy: pull-push\n",
        )
        .unwrap();
        let cache = job.cache.unwrap();
        assert!(matches!(cache.key, Some(CacheKey::Files { .. })));
        assert_eq!(cache.policy, Some(CachePolicy::PullPush));
    }

    #[test]
    fn test_trigger_forms() {
        let job = parse_job("t", "trigger: group/app").unwrap();
        assert_eq!(job.trigger.unwrap().project.as_deref(), Some("group/app"));
        assert!(parse_job("t", "trigger:\n  strategy: depend\n").is_err());
    }

    #[test]
    fn test_default_block() {
        let mut diags = Diagnostics::new();
        let default = JobParser::parse_default(
            &v("image: rust:1.80\nbefore_script: [rustup show]\ninterruptible: true"),
            &mut diags,
        )
        .unwrap();
        assert_eq!(default.image.as_deref(), Some("rust:1.80"));
        assert_eq!(default.interruptible, Some(true));
        assert!(!default.is_empty());
    }

    #[test]
    fn test_bad_script_shape_fails_job() {
        let err = parse_job("build", "script:\n  nested: map").unwrap_err();
        assert!(matches!(err, ParseError::Shape { .. }));
    }
}
