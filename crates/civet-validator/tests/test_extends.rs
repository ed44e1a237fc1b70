//! Template resolution integration tests

use civet_core::diagnostics::DiagnosticKind;
use civet_core::model::{CacheKey, Retry};
use civet_validator::Validator;

#[test]
fn test_multi_parent_merge() {
    let source = r#"
.base1:
  script: [a]
  variables:
    X: "1"
.base2:
  variables:
    Y: "2"
job:
  extends: [.base1, .base2]
"#;
    let validated = Validator::default().validate_str(source).unwrap();
    assert!(validated.is_valid());

    let job = validated.pipeline.jobs.get("job").unwrap();
    assert_eq!(job.script, Some(vec!["a".to_string()]));
    assert!(job.extends.is_empty());

    let vars = job.variables.as_ref().unwrap();
    assert_eq!(vars.get("X").and_then(|v| v.value()), Some("1"));
    assert_eq!(vars.get("Y").and_then(|v| v.value()), Some("2"));
}

#[test]
fn test_later_parent_wins_per_key() {
    let source = r#"
.base1:
  image: first
  variables:
    X: "base1"
.base2:
  image: second
  variables:
    X: "base2"
job:
  extends: [.base1, .base2]
  script: [x]
"#;
    let validated = Validator::default().validate_str(source).unwrap();
    let job = validated.pipeline.jobs.get("job").unwrap();
    assert_eq!(job.image.as_deref(), Some("second"));
    assert_eq!(
        job.variables
            .as_ref()
            .and_then(|v| v.get("X"))
            .and_then(|v| v.value()),
        Some("base2")
    );
}

#[test]
fn test_grandparent_chain() {
    let source = r#"
.root:
  image: alpine
  tags: [shared]
.mid:
  extends: .root
  tags: [special]
job:
  extends: .mid
  script: [x]
"#;
    let validated = Validator::default().validate_str(source).unwrap();
    assert!(validated.is_valid());

    let job = validated.pipeline.jobs.get("job").unwrap();
    assert_eq!(job.image.as_deref(), Some("alpine"));
    // sequences replace wholesale, closest definition wins
    assert_eq!(job.tags, Some(vec!["special".to_string()]));
}

#[test]
fn test_child_sequence_shadows_parent() {
    let source = r#"
.base:
  script: [a, b]
  before_script: [setup]
job:
  extends: .base
  script: [c]
"#;
    let validated = Validator::default().validate_str(source).unwrap();
    let job = validated.pipeline.jobs.get("job").unwrap();
    assert_eq!(job.script, Some(vec!["c".to_string()]));
    assert_eq!(job.before_script, Some(vec!["setup".to_string()]));
}

#[test]
fn test_cache_key_survives_child_paths_override() {
    let source = r#"
.base:
  cache:
    key: base-key
    paths: [target/]
job:
  extends: .base
  script: [x]
  cache:
    paths: [dist/]
"#;
    let validated = Validator::default().validate_str(source).unwrap();
    assert!(validated.is_valid());

    let cache = validated
        .pipeline
        .jobs
        .get("job")
        .unwrap()
        .cache
        .as_ref()
        .unwrap();
    assert_eq!(cache.paths, vec!["dist/"]);
    assert_eq!(cache.key, Some(CacheKey::Value("base-key".to_string())));
}

#[test]
fn test_object_fields_merged_per_key() {
    let source = r#"
.base:
  artifacts:
    paths: [target/]
    expire_in: 1 week
  environment:
    name: staging
    url: https://stage.example.com
  retry:
    max: 1
    when: [runner_system_failure]
job:
  extends: .base
  script: [x]
  artifacts:
    paths: [dist/]
  environment:
    name: production
  retry:
    max: 2
"#;
    let validated = Validator::default().validate_str(source).unwrap();
    assert!(validated.is_valid());
    let job = validated.pipeline.jobs.get("job").unwrap();

    let artifacts = job.artifacts.as_ref().unwrap();
    assert_eq!(artifacts.paths, vec!["dist/"]);
    assert_eq!(artifacts.expire_in.as_deref(), Some("1 week"));

    let environment = job.environment.as_ref().unwrap();
    assert_eq!(environment.name, "production");
    assert_eq!(environment.url.as_deref(), Some("https://stage.example.com"));

    assert_eq!(
        job.retry,
        Some(Retry::Spec {
            max: 2,
            when: Some(vec!["runner_system_failure".to_string()]),
        })
    );
}

#[test]
fn test_unknown_parent_reported_others_resolved() {
    let source = r#"
broken:
  extends: .ghost
  script: [x]
fine:
  script: [y]
"#;
    let validated = Validator::default().validate_str(source).unwrap();
    assert!(!validated.is_valid());
    assert!(validated
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::Extends && d.message.contains(".ghost")));

    // the broken job survives with its chain cleared
    let broken = validated.pipeline.jobs.get("broken").unwrap();
    assert!(broken.extends.is_empty());
    assert!(validated.pipeline.jobs.contains("fine"));
}

#[test]
fn test_cycle_names_chain() {
    let source = r#"
.a:
  extends: .b
.b:
  extends: .a
job:
  extends: .a
  script: [x]
"#;
    let validated = Validator::default().validate_str(source).unwrap();
    assert!(!validated.is_valid());

    let cycle = validated
        .diagnostics
        .iter()
        .find(|d| d.kind == DiagnosticKind::Extends)
        .unwrap();
    assert!(
        cycle.message.contains(".a -> .b -> .a") || cycle.message.contains(".b -> .a -> .b"),
        "{}",
        cycle.message
    );
}

#[test]
fn test_resolution_is_deterministic() {
    let source = r#"
.base:
  variables:
    X: "1"
a:
  extends: .base
  script: [x]
b:
  extends: .base
  script: [y]
"#;
    let first = Validator::default().validate_str(source).unwrap();
    let second = Validator::default().validate_str(source).unwrap();
    assert_eq!(first.pipeline, second.pipeline);
}
