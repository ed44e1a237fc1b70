//! Job definitions
//!
//! A job is one schedulable unit of work. Hidden templates share the same
//! record with `schedulable` set to false; they are never scheduled and only
//! serve as `extends` merge sources.

use crate::model::artifacts::Artifacts;
use crate::model::cache::Cache;
use crate::model::environment::{Environment, Service};
use crate::model::parallel::Parallel;
use crate::model::rule::Rule;
use crate::model::variables::Variables;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Execution condition for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum When {
    OnSuccess,
    OnFailure,
    Always,
    Manual,
    Delayed,
    Never,
}

impl When {
    /// All recognized keywords, for diagnostics
    pub const KEYWORDS: &'static [&'static str] = &[
        "on_success",
        "on_failure",
        "always",
        "manual",
        "delayed",
        "never",
    ];
}

impl FromStr for When {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_success" => Ok(When::OnSuccess),
            "on_failure" => Ok(When::OnFailure),
            "always" => Ok(When::Always),
            "manual" => Ok(When::Manual),
            "delayed" => Ok(When::Delayed),
            "never" => Ok(When::Never),
            other => Err(format!(
                "unrecognized when value '{}', expected one of: {}",
                other,
                When::KEYWORDS.join(", ")
            )),
        }
    }
}

impl fmt::Display for When {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            When::OnSuccess => "on_success",
            When::OnFailure => "on_failure",
            When::Always => "always",
            When::Manual => "manual",
            When::Delayed => "delayed",
            When::Never => "never",
        };
        f.write_str(s)
    }
}

/// Failure tolerance: a plain boolean or a set of tolerated exit codes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AllowFailure {
    Bool(bool),
    ExitCodes { exit_codes: Vec<i32> },
}

/// Highest accepted `retry` count
pub const MAX_RETRY: u8 = 2;

/// Retry policy: a plain count or a count plus failure-kind filter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Retry {
    Max(u8),
    Spec {
        max: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        when: Option<Vec<String>>,
    },
}

impl Retry {
    /// The effective maximum retry count
    pub fn max(&self) -> u8 {
        match self {
            Retry::Max(n) => *n,
            Retry::Spec { max, .. } => *max,
        }
    }

    /// Key-wise merge for two mapping forms; any scalar form in `later`
    /// replaces wholesale.
    pub fn merged_with(&self, later: &Retry) -> Retry {
        match (self, later) {
            (
                Retry::Spec { when: base_when, .. },
                Retry::Spec {
                    max,
                    when: later_when,
                },
            ) => Retry::Spec {
                max: *max,
                when: later_when.clone().or_else(|| base_when.clone()),
            },
            _ => later.clone(),
        }
    }
}

/// One `needs` entry: an explicit job-to-job dependency
#[derive(Debug, Clone, PartialEq)]
pub struct Need {
    /// Referenced job name
    pub job: String,
    /// If true, a missing reference is tolerated
    pub optional: bool,
    /// If true (the default), artifacts are fetched from the needed job
    pub artifacts: bool,
}

impl Need {
    /// Create a plain dependency on `job`
    pub fn new(job: impl Into<String>) -> Self {
        Need {
            job: job.into(),
            optional: false,
            artifacts: true,
        }
    }

    /// Mark the dependency optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

// A need with default flags serializes as a bare job name; otherwise as the
// object form, so round-tripping preserves the written shape.
impl Serialize for Need {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.optional && self.artifacts {
            serializer.serialize_str(&self.job)
        } else {
            let mut s = serializer.serialize_struct("Need", 3)?;
            s.serialize_field("job", &self.job)?;
            s.serialize_field("optional", &self.optional)?;
            s.serialize_field("artifacts", &self.artifacts)?;
            s.end()
        }
    }
}

/// Legacy `only`/`except` conditional form
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OnlyExcept {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub refs: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub variables: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub changes: Vec<String>,
}

impl OnlyExcept {
    /// Create from a plain ref list (the scalar/list form)
    pub fn refs(refs: Vec<String>) -> Self {
        OnlyExcept {
            refs,
            ..OnlyExcept::default()
        }
    }
}

/// Downstream pipeline trigger
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trigger {
    /// Downstream project path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Child-pipeline configuration path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,

    /// `depend` or default fire-and-forget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl Trigger {
    /// Trigger a downstream project
    pub fn project(path: impl Into<String>) -> Self {
        Trigger {
            project: Some(path.into()),
            ..Trigger::default()
        }
    }

    /// Key-wise merge: keys set in `later` override, keys unset in `later`
    /// are retained from `self`
    pub fn merged_with(&self, later: &Trigger) -> Trigger {
        Trigger {
            project: later.project.clone().or_else(|| self.project.clone()),
            include: later.include.clone().or_else(|| self.include.clone()),
            strategy: later.strategy.clone().or_else(|| self.strategy.clone()),
        }
    }
}

/// One schedulable unit of work (or a hidden template when `schedulable` is
/// false)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    /// Unique job name; serialized as the enclosing mapping key, not a field
    #[serde(skip_serializing)]
    pub name: String,

    /// False for hidden templates (names starting with `.`)
    #[serde(skip_serializing)]
    pub schedulable: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extends: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_script: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_script: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs: Option<Vec<Need>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub only: Option<OnlyExcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub except: Option<OnlyExcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Variables>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<Cache>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Artifacts>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<Service>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<Parallel>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<When>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_failure: Option<AllowFailure>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Human duration string, e.g. `30 minutes`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<Retry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interruptible: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<String>,

    /// Legacy artifact-fetch list (predecessor of `needs`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,
}

impl Job {
    /// Create a named job with every field unset
    ///
    /// Names starting with `.` produce a hidden template.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let schedulable = !crate::model::is_hidden_name(&name);
        Job {
            name,
            schedulable,
            stage: None,
            extends: Vec::new(),
            image: None,
            script: None,
            before_script: None,
            after_script: None,
            needs: None,
            rules: None,
            only: None,
            except: None,
            variables: None,
            cache: None,
            artifacts: None,
            environment: None,
            services: None,
            parallel: None,
            when: None,
            allow_failure: None,
            tags: None,
            timeout: None,
            retry: None,
            interruptible: None,
            resource_group: None,
            coverage: None,
            dependencies: None,
            trigger: None,
        }
    }

    /// Set the stage
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Set the script
    pub fn with_script(mut self, script: Vec<String>) -> Self {
        self.script = Some(script);
        self
    }

    /// Set the extends chain
    pub fn with_extends(mut self, extends: Vec<String>) -> Self {
        self.extends = extends;
        self
    }

    /// Set the needs list
    pub fn with_needs(mut self, needs: Vec<Need>) -> Self {
        self.needs = Some(needs);
        self
    }

    /// Set the rules list
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Set the job-scoped variables
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Set the parallel specification
    pub fn with_parallel(mut self, parallel: Parallel) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// True if the job is trigger-only (no script expected)
    pub fn is_trigger_only(&self) -> bool {
        self.trigger.is_some() && self.script.is_none()
    }

    /// Referenced job names from `needs`, if any
    pub fn need_names(&self) -> impl Iterator<Item = &str> {
        self.needs
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|n| n.job.as_str())
    }
}
