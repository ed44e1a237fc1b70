//! Structural rule checks
//!
//! Rules are validated for shape, not evaluated: condition expressions are
//! checked for balanced quoting and bracketing, vacuous rules are rejected,
//! and the mutual exclusion between `rules` and `only`/`except` is enforced.
//! Actually deciding whether a rule matches needs a pipeline context this
//! crate does not model.

use civet_core::diagnostics::{DiagnosticKind, Diagnostics};
use civet_core::model::{Pipeline, Rule};

/// Structural validator for `rules`, `only`/`except`, and workflow rules
pub struct RuleChecker;

impl RuleChecker {
    /// Check every job's rule configuration plus the workflow block
    pub fn check_pipeline(pipeline: &Pipeline, diags: &mut Diagnostics) {
        if let Some(workflow) = &pipeline.workflow {
            Self::check_rules(&workflow.rules, "workflow.rules", diags);
        }

        for job in pipeline.jobs.schedulable() {
            if job.rules.is_some() && (job.only.is_some() || job.except.is_some()) {
                diags.error(
                    DiagnosticKind::RuleSyntax,
                    &job.name,
                    "'rules' cannot be combined with 'only' or 'except'",
                );
            }
            if let Some(rules) = &job.rules {
                Self::check_rules(rules, &format!("{}.rules", job.name), diags);
            }

            if job.script.is_none() && !job.is_trigger_only() {
                diags.warning(
                    DiagnosticKind::Shape,
                    &job.name,
                    "job has no script and is not a trigger job",
                );
            }
        }
    }

    fn check_rules(rules: &[Rule], path: &str, diags: &mut Diagnostics) {
        for (i, rule) in rules.iter().enumerate() {
            let rule_path = format!("{path}[{i}]");
            if rule.is_vacuous() {
                diags.error(
                    DiagnosticKind::RuleSyntax,
                    rule_path.clone(),
                    "rule has no condition and no effect",
                );
            }
            if let Some(condition) = &rule.if_condition {
                if let Err(problem) = check_condition(condition) {
                    diags.error(
                        DiagnosticKind::RuleSyntax,
                        rule_path,
                        format!("malformed condition: {problem}"),
                    );
                }
            }
        }
    }
}

/// Check an `if:` expression for balanced quotes, parentheses, and brackets
///
/// Quoted spans are opaque: a bracket inside a string literal does not count,
/// and a backslash escapes the following character.
fn check_condition(expr: &str) -> Result<(), String> {
    let mut stack: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in expr.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => {
                if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' => stack.push(c),
                ')' => {
                    if stack.pop() != Some('(') {
                        return Err("unmatched ')'".to_string());
                    }
                }
                ']' => {
                    if stack.pop() != Some('[') {
                        return Err("unmatched ']'".to_string());
                    }
                }
                _ => {}
            },
        }
    }

    if let Some(q) = quote {
        return Err(format!("unterminated {q} quote"));
    }
    if let Some(open) = stack.pop() {
        return Err(format!("unclosed '{open}'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use civet_core::model::{Job, OnlyExcept, When};

    #[test]
    fn test_condition_balance() {
        assert!(check_condition("$CI_COMMIT_BRANCH == \"main\"").is_ok());
        assert!(check_condition("($A || $B) && $C =~ /re/").is_ok());
        assert!(check_condition("$X == \"a (quoted ( paren\"").is_ok());
        assert!(check_condition("($A || $B").is_err());
        assert!(check_condition("$A)").is_err());
        assert!(check_condition("$X == \"open").is_err());
    }

    #[test]
    fn test_condition_escaped_quotes() {
        assert!(check_condition(r#"$X == "a\"b""#).is_ok());
        assert!(check_condition(r"$X == 'it\'s fine'").is_ok());
        assert!(check_condition(r#"$X == "trailing\""#).is_err());
    }

    #[test]
    fn test_rules_exclusive_with_only() {
        let mut pipeline = Pipeline::new();
        let mut job = Job::new("j")
            .with_script(vec!["x".into()])
            .with_rules(vec![Rule::new().with_if("$A")]);
        job.only = Some(OnlyExcept::refs(vec!["main".into()]));
        pipeline.add_job(job).unwrap();

        let mut diags = Diagnostics::new();
        RuleChecker::check_pipeline(&pipeline, &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_vacuous_rule_rejected() {
        let mut pipeline = Pipeline::new();
        pipeline
            .add_job(
                Job::new("j")
                    .with_script(vec!["x".into()])
                    .with_rules(vec![Rule::new()]),
            )
            .unwrap();

        let mut diags = Diagnostics::new();
        RuleChecker::check_pipeline(&pipeline, &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_missing_script_is_warning_only() {
        let mut pipeline = Pipeline::new();
        pipeline
            .add_job(Job::new("j").with_rules(vec![Rule::new().with_when(When::Manual)]))
            .unwrap();

        let mut diags = Diagnostics::new();
        RuleChecker::check_pipeline(&pipeline, &mut diags);
        assert!(!diags.has_errors());
        assert_eq!(diags.len(), 1);
    }
}
