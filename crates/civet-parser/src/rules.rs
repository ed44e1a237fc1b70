//! Rule and only/except parsers

use crate::error::{ParseError, Result};
use crate::norm::{self, SeqOrMapping};
use crate::yaml::Yaml;
use civet_core::model::{AllowFailure, OnlyExcept, Rule, Variables, When};
use serde_yaml::Value;

/// Fields recognized inside a single rule entry
const RULE_FIELDS: &[&str] = &[
    "if",
    "changes",
    "exists",
    "when",
    "allow_failure",
    "variables",
];

/// Rule parser
pub struct RulesParser;

impl RulesParser {
    /// Parse a `rules` list
    pub fn parse_rules(value: &Value, path: &str) -> Result<Vec<Rule>> {
        let items = value.as_sequence().ok_or_else(|| ParseError::Shape {
            path: path.to_string(),
            expected: "a list of rule objects".to_string(),
            actual: Yaml::type_name(value).to_string(),
        })?;

        let mut rules = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            rules.push(Self::parse_rule(item, &format!("{path}[{i}]"))?);
        }
        Ok(rules)
    }

    /// Parse one rule entry
    pub fn parse_rule(value: &Value, path: &str) -> Result<Rule> {
        let obj = Yaml::as_mapping(value, path)?;

        for key in obj.keys() {
            if let Some(name) = key.as_str() {
                if !RULE_FIELDS.contains(&name) {
                    return Err(ParseError::RuleSyntax {
                        path: path.to_string(),
                        message: format!("unknown rule field '{name}'"),
                    });
                }
            }
        }

        let mut rule = Rule::new();

        if let Some(cond) = value.get("if") {
            rule.if_condition = Some(norm::scalar_string(cond, &Yaml::join(path, "if"))?);
        }
        if let Some(changes) = value.get("changes") {
            rule.changes = Some(Self::parse_patterns(changes, &Yaml::join(path, "changes"))?);
        }
        if let Some(exists) = value.get("exists") {
            rule.exists = Some(Self::parse_patterns(exists, &Yaml::join(path, "exists"))?);
        }
        if let Some(when) = value.get("when") {
            rule.when = Some(Self::parse_when(when, &Yaml::join(path, "when"))?);
        }
        if let Some(af) = value.get("allow_failure") {
            rule.allow_failure = Some(Self::parse_allow_failure(
                af,
                &Yaml::join(path, "allow_failure"),
            )?);
        }
        if let Some(vars) = value.get("variables") {
            rule.variables = Some(Self::parse_variables(
                vars,
                &Yaml::join(path, "variables"),
            )?);
        }

        Ok(rule)
    }

    /// Parse a `when` keyword
    pub fn parse_when(value: &Value, path: &str) -> Result<When> {
        let s = value.as_str().ok_or_else(|| ParseError::Shape {
            path: path.to_string(),
            expected: "a when keyword string".to_string(),
            actual: Yaml::type_name(value).to_string(),
        })?;
        s.parse().map_err(|message| ParseError::RuleSyntax {
            path: path.to_string(),
            message,
        })
    }

    /// Parse an `allow_failure` value (boolean or exit-code object)
    pub fn parse_allow_failure(value: &Value, path: &str) -> Result<AllowFailure> {
        match value {
            Value::Bool(b) => Ok(AllowFailure::Bool(*b)),
            Value::Mapping(_) => {
                let codes = value.get("exit_codes").ok_or_else(|| ParseError::MissingField {
                    path: Yaml::join(path, "exit_codes"),
                })?;
                let code_path = Yaml::join(path, "exit_codes");
                let exit_codes = match codes {
                    Value::Number(n) => vec![n.as_i64().ok_or_else(|| ParseError::InvalidValue {
                        path: code_path.clone(),
                        message: "exit code must be an integer".to_string(),
                    })? as i32],
                    Value::Sequence(items) => {
                        let mut out = Vec::with_capacity(items.len());
                        for item in items {
                            let n = item.as_i64().ok_or_else(|| ParseError::InvalidValue {
                                path: code_path.clone(),
                                message: "exit codes must be integers".to_string(),
                            })?;
                            out.push(n as i32);
                        }
                        out
                    }
                    other => {
                        return Err(ParseError::Shape {
                            path: code_path,
                            expected: "an integer or a list of integers".to_string(),
                            actual: Yaml::type_name(other).to_string(),
                        })
                    }
                };
                Ok(AllowFailure::ExitCodes { exit_codes })
            }
            other => Err(ParseError::Shape {
                path: path.to_string(),
                expected: "a boolean or an exit-code object".to_string(),
                actual: Yaml::type_name(other).to_string(),
            }),
        }
    }

    /// Parse a variable set (scalar values or detailed objects)
    pub fn parse_variables(value: &Value, path: &str) -> Result<Variables> {
        let obj = Yaml::as_mapping(value, path)?;
        let mut vars = Variables::new();

        for (key, v) in obj {
            let name = key.as_str().ok_or_else(|| ParseError::Shape {
                path: path.to_string(),
                expected: "string variable names".to_string(),
                actual: Yaml::type_name(key).to_string(),
            })?;
            let var_path = Yaml::join(path, name);

            match v {
                Value::Mapping(_) => {
                    let detailed = civet_core::model::VariableValue::Detailed {
                        value: match v.get("value") {
                            Some(val) => Some(norm::scalar_string(val, &Yaml::join(&var_path, "value"))?),
                            None => None,
                        },
                        description: Yaml::get_optional_string(v, "description"),
                        expand: Yaml::get_optional_bool(v, "expand"),
                        options: match v.get("options") {
                            Some(opts) => {
                                Some(norm::string_or_list(opts, &Yaml::join(&var_path, "options"))?)
                            }
                            None => None,
                        },
                    };
                    vars.0.insert(name.to_string(), detailed);
                }
                other => {
                    vars.set(name, norm::scalar_string(other, &var_path)?);
                }
            }
        }

        Ok(vars)
    }

    /// Parse a legacy `only`/`except` block (ref list or structured object)
    pub fn parse_only_except(value: &Value, path: &str) -> Result<OnlyExcept> {
        match norm::seq_or_mapping(value, path) {
            Ok(SeqOrMapping::Seq(_)) => {
                Ok(OnlyExcept::refs(norm::string_or_list(value, path)?))
            }
            Ok(SeqOrMapping::Mapping(_)) => {
                let mut out = OnlyExcept::default();
                if let Some(refs) = value.get("refs") {
                    out.refs = norm::string_or_list(refs, &Yaml::join(path, "refs"))?;
                }
                if let Some(variables) = value.get("variables") {
                    out.variables =
                        norm::string_or_list(variables, &Yaml::join(path, "variables"))?;
                }
                if let Some(changes) = value.get("changes") {
                    out.changes = norm::string_or_list(changes, &Yaml::join(path, "changes"))?;
                }
                Ok(out)
            }
            // A single ref written as a bare string is also accepted
            Err(_) if value.is_string() => Ok(OnlyExcept::refs(norm::string_or_list(value, path)?)),
            Err(e) => Err(e),
        }
    }

    /// Parse change/exists patterns: a list, or an object with `paths`
    fn parse_patterns(value: &Value, path: &str) -> Result<Vec<String>> {
        match value {
            Value::Mapping(_) => {
                let paths = value.get("paths").ok_or_else(|| ParseError::MissingField {
                    path: Yaml::join(path, "paths"),
                })?;
                norm::string_or_list(paths, &Yaml::join(path, "paths"))
            }
            other => norm::string_or_list(other, path).map_err(|_| ParseError::Shape {
                path: path.to_string(),
                expected: "a list of patterns or an object with 'paths'".to_string(),
                actual: Yaml::type_name(other).to_string(),
            }),
        }
    }
}
