//! Cache definitions
//!
//! Caches are validated structurally; cache behavior itself is a runtime
//! concern outside this model.

use serde::Serialize;

/// Cache key: either a literal string or a file-hash specification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CacheKey {
    /// Literal key, e.g. `$CI_COMMIT_REF_SLUG`
    Value(String),

    /// Key derived from file contents
    Files {
        files: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },
}

/// Upload/download policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CachePolicy {
    #[serde(rename = "pull")]
    Pull,
    #[serde(rename = "push")]
    Push,
    #[serde(rename = "pull-push")]
    PullPush,
}

/// Per-job or default cache configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cache {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<CacheKey>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub paths: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<CachePolicy>,

    /// `on_success`, `on_failure`, or `always`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub untracked: Option<bool>,
}

impl Cache {
    /// Create a cache with the given paths
    pub fn new(paths: Vec<String>) -> Self {
        Cache {
            paths,
            ..Cache::default()
        }
    }

    /// Set the cache key
    pub fn with_key(mut self, key: CacheKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Set the policy
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Key-wise merge: keys set in `later` override, keys unset in `later`
    /// are retained from `self`. `paths` is a sequence and replaces wholesale.
    pub fn merged_with(&self, later: &Cache) -> Cache {
        Cache {
            key: later.key.clone().or_else(|| self.key.clone()),
            paths: if later.paths.is_empty() {
                self.paths.clone()
            } else {
                later.paths.clone()
            },
            policy: later.policy.or(self.policy),
            when: later.when.clone().or_else(|| self.when.clone()),
            untracked: later.untracked.or(self.untracked),
        }
    }
}
