//! Environment and service definitions

use serde::Serialize;

/// Deployment environment action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentAction {
    Start,
    Prepare,
    Stop,
    Verify,
    Access,
}

/// Deployment environment attached to a job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Environment {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_stop: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<EnvironmentAction>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_tier: Option<String>,
}

impl Environment {
    /// Create an environment with just a name
    pub fn new(name: impl Into<String>) -> Self {
        Environment {
            name: name.into(),
            url: None,
            on_stop: None,
            action: None,
            deployment_tier: None,
        }
    }

    /// Set the environment URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Key-wise merge: keys set in `later` override, keys unset in `later`
    /// are retained from `self`. The name always comes from `later`.
    pub fn merged_with(&self, later: &Environment) -> Environment {
        Environment {
            name: later.name.clone(),
            url: later.url.clone().or_else(|| self.url.clone()),
            on_stop: later.on_stop.clone().or_else(|| self.on_stop.clone()),
            action: later.action.or(self.action),
            deployment_tier: later
                .deployment_tier
                .clone()
                .or_else(|| self.deployment_tier.clone()),
        }
    }
}

/// Auxiliary container started alongside a job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
}

impl Service {
    /// Create a service with just an image name
    pub fn new(name: impl Into<String>) -> Self {
        Service {
            name: name.into(),
            alias: None,
            entrypoint: None,
            command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_builder() {
        let env = Environment::new("production").with_url("https://example.com");
        assert_eq!(env.name, "production");
        assert_eq!(env.url.as_deref(), Some("https://example.com"));
        assert!(env.action.is_none());
    }

    #[test]
    fn test_merge_retains_unset_keys() {
        let base = Environment::new("staging").with_url("https://stage.example.com");
        let mut over = Environment::new("production");
        over.action = Some(EnvironmentAction::Start);

        let merged = base.merged_with(&over);
        assert_eq!(merged.name, "production");
        assert_eq!(merged.url.as_deref(), Some("https://stage.example.com"));
        assert_eq!(merged.action, Some(EnvironmentAction::Start));
    }

    #[test]
    fn test_service_creation() {
        let svc = Service::new("postgres:16");
        assert_eq!(svc.name, "postgres:16");
        assert!(svc.alias.is_none());
    }
}
