//! Dependency validation integration tests

use civet_core::diagnostics::DiagnosticKind;
use civet_validator::{Validator, ValidatorOptions};

fn dependency_errors(source: &str, dag_mode: bool) -> Vec<String> {
    let validated = Validator::new(ValidatorOptions {
        dag_mode,
        ..Default::default()
    })
    .validate_str(source)
    .unwrap();
    validated
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::Dependency)
        .map(|d| d.message.clone())
        .collect()
}

#[test]
fn test_build_test_deploy_chain() {
    let source = r#"
stages: [build, test, deploy]
compile:
  stage: build
  script: [make]
unit:
  stage: test
  needs: [compile]
  script: [make check]
ship:
  stage: deploy
  needs: [unit]
  script: [make ship]
"#;
    assert!(dependency_errors(source, false).is_empty());
}

#[test]
fn test_earlier_stage_needing_later_is_one_error() {
    let source = r#"
stages: [build, deploy]
early:
  stage: build
  needs: [late]
  script: [x]
late:
  stage: deploy
  script: [y]
"#;
    let errors = dependency_errors(source, false);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("'late'"));
    assert!(errors[0].contains("deploy"));

    // dag mode drops the stage-order constraint entirely
    assert!(dependency_errors(source, true).is_empty());
}

#[test]
fn test_all_unknown_needs_reported() {
    let source = r#"
a:
  script: [x]
  needs: [ghost1, ghost2]
"#;
    let errors = dependency_errors(source, false);
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_need_on_hidden_template_is_unknown() {
    let source = r#"
.tmpl:
  script: [x]
a:
  script: [y]
  needs: [.tmpl]
"#;
    let errors = dependency_errors(source, false);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains(".tmpl"));
}

#[test]
fn test_undeclared_stage() {
    let source = "stages: [build]\nj:\n  stage: qa\n  script: [x]\n";
    let errors = dependency_errors(source, false);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("qa"));
}

#[test]
fn test_implicit_stage_only_test_exists() {
    let ok = "j:\n  stage: test\n  script: [x]\n";
    assert!(dependency_errors(ok, false).is_empty());

    let bad = "j:\n  stage: build\n  script: [x]\n";
    assert_eq!(dependency_errors(bad, false).len(), 1);
}

#[test]
fn test_needs_cycle_path_is_exact() {
    let source = r#"
a:
  script: [x]
  needs: [b]
b:
  script: [x]
  needs: [a]
"#;
    let errors = dependency_errors(source, false);
    let cycle = errors.iter().find(|m| m.contains("Circular")).unwrap();
    assert!(
        cycle.contains("a -> b -> a") || cycle.contains("b -> a -> b"),
        "{cycle}"
    );
}

#[test]
fn test_graph_exposes_edges() {
    let source = r#"
stages: [build, test]
compile:
  stage: build
  script: [make]
unit:
  stage: test
  needs: [compile]
  script: [make check]
"#;
    let validated = Validator::default().validate_str(source).unwrap();
    assert!(validated.is_valid());
    assert_eq!(validated.graph.needs_of("unit"), ["compile"]);
    assert!(validated.graph.needs_of("compile").is_empty());
}
