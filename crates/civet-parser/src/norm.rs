//! Field normalizer
//!
//! Several configuration fields may be written as a scalar, a list, or an
//! object depending on usage. This module coerces each such field into one
//! canonical internal shape, so the entity model never sees the ambiguity.
//! All functions are pure; failure names the field path and the shapes that
//! were attempted.

use crate::error::{ParseError, Result};
use crate::yaml::Yaml;
use serde_yaml::{Mapping, Value};

/// Canonical result of a scalar-or-object field
pub enum ScalarOrMapping<'a> {
    Scalar(String),
    Mapping(&'a Mapping),
}

/// Canonical result of a list-or-object field
pub enum SeqOrMapping<'a> {
    Seq(&'a Vec<Value>),
    Mapping(&'a Mapping),
}

/// Coerce a scalar node (string, number, or boolean) to a string
pub fn scalar_string(value: &Value, path: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(ParseError::Shape {
            path: path.to_string(),
            expected: "a scalar (string, number, or boolean)".to_string(),
            actual: Yaml::type_name(other).to_string(),
        }),
    }
}

/// Coerce a scalar-or-list field to a list of strings
///
/// A single scalar becomes a one-element list. One level of nested lists is
/// flattened, matching how multi-line script blocks are commonly written.
pub fn string_or_list(value: &Value, path: &str) -> Result<Vec<String>> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            Ok(vec![scalar_string(value, path)?])
        }
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{i}]");
                match item {
                    Value::Sequence(inner) => {
                        for (j, nested) in inner.iter().enumerate() {
                            out.push(scalar_string(nested, &format!("{item_path}[{j}]"))?);
                        }
                    }
                    other => out.push(scalar_string(other, &item_path)?),
                }
            }
            Ok(out)
        }
        other => Err(ParseError::Shape {
            path: path.to_string(),
            expected: "a string or a list of strings".to_string(),
            actual: Yaml::type_name(other).to_string(),
        }),
    }
}

/// Coerce a scalar-or-object field into its canonical tagged shape
pub fn scalar_or_mapping<'a>(value: &'a Value, path: &str) -> Result<ScalarOrMapping<'a>> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            Ok(ScalarOrMapping::Scalar(scalar_string(value, path)?))
        }
        Value::Mapping(m) => Ok(ScalarOrMapping::Mapping(m)),
        other => Err(ParseError::Shape {
            path: path.to_string(),
            expected: "a scalar or an object".to_string(),
            actual: Yaml::type_name(other).to_string(),
        }),
    }
}

/// Coerce a list-or-object field into its canonical tagged shape
pub fn seq_or_mapping<'a>(value: &'a Value, path: &str) -> Result<SeqOrMapping<'a>> {
    match value {
        Value::Sequence(s) => Ok(SeqOrMapping::Seq(s)),
        Value::Mapping(m) => Ok(SeqOrMapping::Mapping(m)),
        other => Err(ParseError::Shape {
            path: path.to_string(),
            expected: "a list or an object".to_string(),
            actual: Yaml::type_name(other).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_scalar_becomes_single_element_list() {
        assert_eq!(
            string_or_list(&v("echo hi"), "script").unwrap(),
            vec!["echo hi"]
        );
    }

    #[test]
    fn test_list_of_scalars() {
        let value = v("- echo a\n- echo b");
        assert_eq!(
            string_or_list(&value, "script").unwrap(),
            vec!["echo a", "echo b"]
        );
    }

    #[test]
    fn test_nested_list_is_flattened_one_level() {
        let value = v("- echo a\n- [echo b, echo c]");
        assert_eq!(
            string_or_list(&value, "script").unwrap(),
            vec!["echo a", "echo b", "echo c"]
        );
    }

    #[test]
    fn test_numbers_coerce_to_strings() {
        assert_eq!(string_or_list(&v("42"), "tags").unwrap(), vec!["42"]);
    }

    #[test]
    fn test_mapping_rejected_with_shapes_named() {
        let err = string_or_list(&v("a: b"), "jobs.build.script").unwrap_err();
        match err {
            ParseError::Shape {
                path,
                expected,
                actual,
            } => {
                assert_eq!(path, "jobs.build.script");
                assert!(expected.contains("list of strings"));
                assert_eq!(actual, "an object");
            }
            other => panic!("expected Shape error, got {other:?}"),
        }
    }

    #[test]
    fn test_scalar_or_mapping_both_shapes() {
        assert!(matches!(
            scalar_or_mapping(&v("production"), "environment").unwrap(),
            ScalarOrMapping::Scalar(s) if s == "production"
        ));
        assert!(matches!(
            scalar_or_mapping(&v("name: production"), "environment").unwrap(),
            ScalarOrMapping::Mapping(_)
        ));
        assert!(scalar_or_mapping(&v("- a"), "environment").is_err());
    }

    #[test]
    fn test_seq_or_mapping_both_shapes() {
        assert!(matches!(
            seq_or_mapping(&v("- a"), "only").unwrap(),
            SeqOrMapping::Seq(_)
        ));
        assert!(matches!(
            seq_or_mapping(&v("refs: [main]"), "only").unwrap(),
            SeqOrMapping::Mapping(_)
        ));
        assert!(seq_or_mapping(&v("main"), "only").is_err());
    }
}
