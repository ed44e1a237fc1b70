//! Artifact definitions

use serde::Serialize;
use std::collections::BTreeMap;

/// When artifacts are uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactsWhen {
    OnSuccess,
    OnFailure,
    Always,
}

/// Per-job artifact configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Artifacts {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub paths: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub exclude: Vec<String>,

    /// Human duration string, e.g. `30 days`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_in: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expose_as: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<ArtifactsWhen>,

    /// Report artifacts (junit, coverage, ...). Kept opaque: validated as a
    /// mapping but not interpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports: Option<BTreeMap<String, serde_yaml::Value>>,
}

impl Artifacts {
    /// Create artifacts with the given paths
    pub fn new(paths: Vec<String>) -> Self {
        Artifacts {
            paths,
            ..Artifacts::default()
        }
    }

    /// Set the expiry
    pub fn with_expire_in(mut self, expire_in: impl Into<String>) -> Self {
        self.expire_in = Some(expire_in.into());
        self
    }

    /// Set the upload condition
    pub fn with_when(mut self, when: ArtifactsWhen) -> Self {
        self.when = Some(when);
        self
    }

    /// Key-wise merge: keys set in `later` override, keys unset in `later`
    /// are retained from `self`. `paths` and `exclude` are sequences and
    /// replace wholesale; `reports` is a nested mapping and merges per key.
    pub fn merged_with(&self, later: &Artifacts) -> Artifacts {
        let reports = match (&self.reports, &later.reports) {
            (Some(base), Some(over)) => {
                let mut out = base.clone();
                for (k, v) in over {
                    out.insert(k.clone(), v.clone());
                }
                Some(out)
            }
            (Some(base), None) => Some(base.clone()),
            (None, over) => over.clone(),
        };
        Artifacts {
            paths: if later.paths.is_empty() {
                self.paths.clone()
            } else {
                later.paths.clone()
            },
            exclude: if later.exclude.is_empty() {
                self.exclude.clone()
            } else {
                later.exclude.clone()
            },
            expire_in: later.expire_in.clone().or_else(|| self.expire_in.clone()),
            expose_as: later.expose_as.clone().or_else(|| self.expose_as.clone()),
            name: later.name.clone().or_else(|| self.name.clone()),
            when: later.when.or(self.when),
            reports,
        }
    }
}
