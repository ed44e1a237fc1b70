//! Include directive parser

use crate::error::{ParseError, Result};
use crate::norm;
use crate::rules::RulesParser;
use crate::yaml::Yaml;
use civet_core::model::{Include, IncludeRef};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Include parser
pub struct IncludeParser;

impl IncludeParser {
    /// Parse an `include` value
    ///
    /// Accepted shapes:
    /// - a single path string
    /// - a single include object
    /// - a list mixing both
    pub fn parse(value: &Value, path: &str) -> Result<Vec<Include>> {
        match value {
            Value::String(s) => Ok(vec![Include::new(Self::ref_from_path(s))]),
            Value::Mapping(_) => Ok(vec![Self::parse_entry(value, path)?]),
            Value::Sequence(items) => {
                let mut includes = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{i}]");
                    match item {
                        Value::String(s) => includes.push(Include::new(Self::ref_from_path(s))),
                        Value::Mapping(_) => includes.push(Self::parse_entry(item, &item_path)?),
                        other => {
                            return Err(ParseError::Shape {
                                path: item_path,
                                expected: "a path string or an include object".to_string(),
                                actual: Yaml::type_name(other).to_string(),
                            })
                        }
                    }
                }
                Ok(includes)
            }
            other => Err(ParseError::Shape {
                path: path.to_string(),
                expected: "a string, an object, or a list of includes".to_string(),
                actual: Yaml::type_name(other).to_string(),
            }),
        }
    }

    /// A bare path string is a local include, unless it is a URL
    fn ref_from_path(s: &str) -> IncludeRef {
        if s.starts_with("http://") || s.starts_with("https://") {
            IncludeRef::Remote(s.to_string())
        } else {
            IncludeRef::Local(s.to_string())
        }
    }

    /// Parse one include object
    fn parse_entry(value: &Value, path: &str) -> Result<Include> {
        let reference = if let Some(local) = Yaml::get_optional_string(value, "local") {
            IncludeRef::Local(local)
        } else if let Some(remote) = Yaml::get_optional_string(value, "remote") {
            IncludeRef::Remote(remote)
        } else if let Some(template) = Yaml::get_optional_string(value, "template") {
            IncludeRef::Template(template)
        } else if let Some(component) = Yaml::get_optional_string(value, "component") {
            IncludeRef::Component(component)
        } else if let Some(project) = Yaml::get_optional_string(value, "project") {
            let file = value.get("file").ok_or_else(|| ParseError::MissingField {
                path: Yaml::join(path, "file"),
            })?;
            IncludeRef::Project {
                project,
                git_ref: Yaml::get_optional_string(value, "ref"),
                file: norm::string_or_list(file, &Yaml::join(path, "file"))?,
            }
        } else {
            return Err(ParseError::InvalidValue {
                path: path.to_string(),
                message: "include must specify one of: local, remote, template, component, project"
                    .to_string(),
            });
        };

        let mut include = Include::new(reference);

        if let Some(inputs) = value.get("inputs") {
            let obj = Yaml::as_mapping(inputs, &Yaml::join(path, "inputs"))?;
            let mut map = BTreeMap::new();
            for (k, v) in obj {
                if let Some(name) = k.as_str() {
                    map.insert(name.to_string(), v.clone());
                }
            }
            include.inputs = Some(map);
        }

        if let Some(rules) = value.get("rules") {
            include.rules = Some(RulesParser::parse_rules(rules, &Yaml::join(path, "rules"))?);
        }

        Ok(include)
    }
}
