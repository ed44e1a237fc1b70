//! Variable set definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single variable value
///
/// Variables may be written as a plain scalar or as an object carrying a
/// description and expansion controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    /// Plain value, e.g. `DEPLOY_ENV: production`
    Scalar(String),

    /// Detailed form, e.g. `DEPLOY_ENV: {value: production, description: ...}`
    Detailed {
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        expand: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<Vec<String>>,
    },
}

impl VariableValue {
    /// The effective scalar value, if one is present
    pub fn value(&self) -> Option<&str> {
        match self {
            VariableValue::Scalar(s) => Some(s),
            VariableValue::Detailed { value, .. } => value.as_deref(),
        }
    }
}

/// An ordered mapping of variable name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(pub BTreeMap<String, VariableValue>);

impl Variables {
    /// Create an empty variable set
    pub fn new() -> Self {
        Variables(BTreeMap::new())
    }

    /// Set a plain scalar variable
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0
            .insert(name.into(), VariableValue::Scalar(value.into()));
    }

    /// Builder-style scalar insertion
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Look up a variable by name
    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.0.get(name)
    }

    /// Number of variables in the set
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the set holds no variables
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key-wise merge: keys from `later` override colliding keys, keys absent
    /// in `later` are retained from `self`
    pub fn merged_with(&self, later: &Variables) -> Variables {
        let mut out = self.0.clone();
        for (k, v) in &later.0 {
            out.insert(k.clone(), v.clone());
        }
        Variables(out)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut vars = Variables::new();
        for (k, v) in iter {
            vars.set(k, v);
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_later_wins() {
        let base: Variables = [("X", "1"), ("Y", "2")].into_iter().collect();
        let over: Variables = [("Y", "9"), ("Z", "3")].into_iter().collect();

        let merged = base.merged_with(&over);
        assert_eq!(merged.get("X").and_then(|v| v.value()), Some("1"));
        assert_eq!(merged.get("Y").and_then(|v| v.value()), Some("9"));
        assert_eq!(merged.get("Z").and_then(|v| v.value()), Some("3"));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_detailed_value() {
        let v = VariableValue::Detailed {
            value: Some("prod".to_string()),
            description: Some("target environment".to_string()),
            expand: None,
            options: None,
        };
        assert_eq!(v.value(), Some("prod"));
    }
}
