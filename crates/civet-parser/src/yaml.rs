//! Generic-tree access utilities
//!
//! Typed getters over `serde_yaml::Value` plus unknown-field detection with
//! typo suggestions. Every getter takes the dotted path of the node it reads
//! so errors point at the exact document location.

use crate::error::{ParseError, Result};
use serde_yaml::{Mapping, Value};

/// Tree access utilities
pub struct Yaml;

impl Yaml {
    /// Join a parent path and a field name into a dotted path
    pub fn join(path: &str, field: &str) -> String {
        if path.is_empty() {
            field.to_string()
        } else {
            format!("{path}.{field}")
        }
    }

    /// Human-readable name of a value's shape, for diagnostics
    pub fn type_name(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Sequence(_) => "a list",
            Value::Mapping(_) => "an object",
            Value::Tagged(_) => "a tagged value",
        }
    }

    /// Get a required string field
    pub fn get_string(obj: &Value, path: &str, field: &str) -> Result<String> {
        let value = obj.get(field).ok_or_else(|| ParseError::MissingField {
            path: Self::join(path, field),
        })?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ParseError::Shape {
                path: Self::join(path, field),
                expected: "a string".to_string(),
                actual: Self::type_name(value).to_string(),
            })
    }

    /// Get an optional string field
    pub fn get_optional_string(obj: &Value, field: &str) -> Option<String> {
        obj.get(field).and_then(|v| v.as_str()).map(str::to_string)
    }

    /// Get an optional boolean field
    pub fn get_optional_bool(obj: &Value, field: &str) -> Option<bool> {
        obj.get(field).and_then(Value::as_bool)
    }

    /// Get an optional unsigned integer field
    pub fn get_optional_u64(obj: &Value, field: &str) -> Option<u64> {
        obj.get(field).and_then(Value::as_u64)
    }

    /// Get an optional array field
    pub fn get_optional_array<'a>(obj: &'a Value, field: &str) -> Option<&'a Vec<Value>> {
        obj.get(field).and_then(Value::as_sequence)
    }

    /// Get an optional mapping field
    pub fn get_optional_mapping<'a>(obj: &'a Value, field: &str) -> Option<&'a Mapping> {
        obj.get(field).and_then(Value::as_mapping)
    }

    /// Require a value to be a mapping
    pub fn as_mapping<'a>(value: &'a Value, path: &str) -> Result<&'a Mapping> {
        value.as_mapping().ok_or_else(|| ParseError::Shape {
            path: path.to_string(),
            expected: "an object".to_string(),
            actual: Self::type_name(value).to_string(),
        })
    }

    /// True if the field exists
    pub fn has_field(obj: &Value, field: &str) -> bool {
        obj.get(field).is_some()
    }

    /// String keys of a mapping value, in document order
    pub fn keys(obj: &Value) -> Vec<String> {
        obj.as_mapping()
            .map(|m| {
                m.keys()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check a mapping's keys against a list of known fields
    ///
    /// Returns one warning message per unknown key, with a suggestion when a
    /// known field is a plausible typo target.
    pub fn unknown_fields(obj: &Value, known_fields: &[&str], path: &str) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(mapping) = obj.as_mapping() {
            for key in mapping.keys() {
                let Some(field_name) = key.as_str() else {
                    continue;
                };
                if known_fields.contains(&field_name) {
                    continue;
                }

                let typo_correction = FIELD_CORRECTIONS
                    .iter()
                    .find(|(typo, _)| *typo == field_name)
                    .map(|(_, correct)| *correct);

                let suggestion = if let Some(correct) = typo_correction {
                    format!(", did you mean '{correct}'?")
                } else if let Some(similar) = Self::find_similar_field(field_name, known_fields) {
                    format!(", did you mean '{similar}'?")
                } else {
                    String::new()
                };

                warnings.push(format!("unknown field '{field_name}' in {path}{suggestion}"));
            }
        }

        warnings
    }

    /// Find the closest known field within a small edit distance
    fn find_similar_field(field: &str, known_fields: &[&str]) -> Option<String> {
        known_fields
            .iter()
            .filter(|known| levenshtein_distance(field, known) <= 2)
            .min_by_key(|known| levenshtein_distance(field, known))
            .map(|s| s.to_string())
    }
}

/// Common field name typos and their corrections
const FIELD_CORRECTIONS: &[(&str, &str)] = &[
    ("extend", "extends"),
    ("need", "needs"),
    ("scripts", "script"),
    ("stages", "stage"),
    ("variable", "variables"),
    ("artifact", "artifacts"),
    ("rule", "rules"),
    ("tag", "tags"),
    ("service", "services"),
    ("allow_failures", "allow_failure"),
];

/// Calculate Levenshtein distance between two strings
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let len1 = s1.len();
    let len2 = s2.len();

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut matrix = vec![vec![0; len2 + 1]; len1 + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=len2 {
        matrix[0][j] = j;
    }

    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    for (i, &c1) in s1_chars.iter().enumerate() {
        for (j, &c2) in s2_chars.iter().enumerate() {
            let cost = usize::from(c1 != c2);
            matrix[i + 1][j + 1] = std::cmp::min(
                std::cmp::min(matrix[i][j + 1] + 1, matrix[i + 1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }

    matrix[len1][len2]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(Yaml::join("", "stages"), "stages");
        assert_eq!(Yaml::join("jobs.build", "script"), "jobs.build.script");
    }

    #[test]
    fn test_get_string() {
        let yaml = parse("stage: build\ncount: 3");
        assert_eq!(Yaml::get_string(&yaml, "", "stage").unwrap(), "build");

        let err = Yaml::get_string(&yaml, "", "count").unwrap_err();
        assert!(matches!(err, ParseError::Shape { .. }));

        let err = Yaml::get_string(&yaml, "", "missing").unwrap_err();
        assert!(matches!(err, ParseError::MissingField { .. }));
    }

    #[test]
    fn test_keys_in_order() {
        let yaml = parse("z: 1\na: 2");
        assert_eq!(Yaml::keys(&yaml), vec!["z", "a"]);
    }

    #[test]
    fn test_unknown_fields_suggests_typo_correction() {
        let yaml = parse("scripts:\n  - echo hi");
        let warnings = Yaml::unknown_fields(&yaml, &["script", "stage"], "build");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'scripts'"));
        assert!(warnings[0].contains("'script'"));
    }

    #[test]
    fn test_unknown_fields_fuzzy_match() {
        let yaml = parse("stge: build");
        let warnings = Yaml::unknown_fields(&yaml, &["stage", "script"], "job");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'stage'"));
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("stage", "stage"), 0);
        assert_eq!(levenshtein_distance("stge", "stage"), 1);
        assert_eq!(levenshtein_distance("", "abc"), 3);
    }
}
