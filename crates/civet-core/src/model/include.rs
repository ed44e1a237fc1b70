//! Include directive definitions
//!
//! An include pulls an external document fragment into the current document.
//! Retrieval is delegated to the caller; the model only records the directive
//! and the identifier used for cycle tracking during composition.

use crate::model::rule::Rule;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Reference to an external fragment
#[derive(Debug, Clone, PartialEq)]
pub enum IncludeRef {
    /// Path inside the same repository, e.g. `/templates/build.yml`
    Local(String),

    /// File(s) in another project
    Project {
        project: String,
        git_ref: Option<String>,
        file: Vec<String>,
    },

    /// Remote URL
    Remote(String),

    /// Named upstream template
    Template(String),

    /// CI/CD component reference
    Component(String),
}

impl IncludeRef {
    /// Canonical identifier for cycle detection and deduplication
    ///
    /// Two directives that resolve to the same fragment must produce the same
    /// identifier.
    pub fn identifier(&self) -> String {
        match self {
            IncludeRef::Local(path) => format!("local:{path}"),
            IncludeRef::Project {
                project,
                git_ref,
                file,
            } => {
                let r = git_ref.as_deref().unwrap_or("HEAD");
                format!("project:{project}@{r}:{}", file.join(","))
            }
            IncludeRef::Remote(url) => format!("remote:{url}"),
            IncludeRef::Template(name) => format!("template:{name}"),
            IncludeRef::Component(name) => format!("component:{name}"),
        }
    }
}

impl fmt::Display for IncludeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

// Serializes to the flat document shape (`{local: path}`,
// `{project: p, ref: r, file: f}`), so it can be flattened into [`Include`]
// and reparsed.
impl Serialize for IncludeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            IncludeRef::Local(path) => map.serialize_entry("local", path)?,
            IncludeRef::Project {
                project,
                git_ref,
                file,
            } => {
                map.serialize_entry("project", project)?;
                if let Some(r) = git_ref {
                    map.serialize_entry("ref", r)?;
                }
                if file.len() == 1 {
                    map.serialize_entry("file", &file[0])?;
                } else {
                    map.serialize_entry("file", file)?;
                }
            }
            IncludeRef::Remote(url) => map.serialize_entry("remote", url)?,
            IncludeRef::Template(name) => map.serialize_entry("template", name)?,
            IncludeRef::Component(name) => map.serialize_entry("component", name)?,
        }
        map.end()
    }
}

/// One include directive plus its optional input parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Include {
    /// What to include
    #[serde(flatten)]
    pub reference: IncludeRef,

    /// Input parameters forwarded to the included fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<BTreeMap<String, serde_yaml::Value>>,

    /// Conditional inclusion rules (validated structurally only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
}

impl Include {
    /// Create an include directive with no inputs
    pub fn new(reference: IncludeRef) -> Self {
        Include {
            reference,
            inputs: None,
            rules: None,
        }
    }

    /// Create a local-path include
    pub fn local(path: impl Into<String>) -> Self {
        Include::new(IncludeRef::Local(path.into()))
    }

    /// Attach input parameters
    pub fn with_inputs(mut self, inputs: BTreeMap<String, serde_yaml::Value>) -> Self {
        self.inputs = Some(inputs);
        self
    }
}
