//! Unit tests for the entity model

use anyhow::Result;
use civet_core::model::{
    is_hidden_name, is_reserved_keyword, Job, Matrix, MatrixDimension, Need, Parallel, Pipeline,
    Rule, Variables, When, Workflow,
};
use civet_core::ModelError;

#[test]
fn test_reserved_and_hidden_names() {
    assert!(is_reserved_keyword("stages"));
    assert!(is_reserved_keyword("default"));
    assert!(!is_reserved_keyword("build"));

    assert!(is_hidden_name(".base"));
    assert!(!is_hidden_name("base"));
}

#[test]
fn test_programmatic_pipeline_construction() -> Result<()> {
    let mut pipeline = Pipeline::new();
    pipeline.add_stage("build")?;
    pipeline.add_stage("test")?;

    pipeline.add_job(
        Job::new("compile")
            .with_stage("build")
            .with_script(vec!["cargo build".to_string()]),
    )?;
    pipeline.add_job(
        Job::new("unit")
            .with_stage("test")
            .with_script(vec!["cargo test".to_string()])
            .with_needs(vec![Need::new("compile")]),
    )?;

    assert_eq!(pipeline.jobs.len(), 2);
    assert_eq!(pipeline.stage_index("test"), Some(1));

    let unit = pipeline.jobs.get("unit").unwrap();
    let needs: Vec<_> = unit.need_names().collect();
    assert_eq!(needs, vec!["compile"]);
    Ok(())
}

#[test]
fn test_duplicate_job_rejected_at_insertion() {
    let mut pipeline = Pipeline::new();
    pipeline.add_job(Job::new("deploy")).unwrap();

    match pipeline.add_job(Job::new("deploy")) {
        Err(ModelError::DuplicateJob(name)) => assert_eq!(name, "deploy"),
        other => panic!("expected DuplicateJob, got {other:?}"),
    }
}

#[test]
fn test_variables_merge_is_keywise() {
    let global: Variables = [("CI", "true"), ("LEVEL", "1")].into_iter().collect();
    let job: Variables = [("LEVEL", "2")].into_iter().collect();

    let merged = global.merged_with(&job);
    assert_eq!(merged.get("CI").and_then(|v| v.value()), Some("true"));
    assert_eq!(merged.get("LEVEL").and_then(|v| v.value()), Some("2"));
}

#[test]
fn test_workflow_with_rules() {
    let workflow = Workflow::new(vec![
        Rule::new().with_if("$CI_COMMIT_TAG"),
        Rule::new().with_when(When::Never),
    ]);
    assert_eq!(workflow.rules.len(), 2);
    assert!(workflow.rules[1].when == Some(When::Never));
}

#[test]
fn test_matrix_counts() {
    let matrix = Matrix::new(vec![
        MatrixDimension::new("OS", vec!["linux".to_string(), "mac".to_string()]),
        MatrixDimension::new("ARCH", vec!["x86".to_string(), "arm".to_string()]),
    ]);
    assert_eq!(matrix.combination_count(), 4);
    assert_eq!(Parallel::Matrix(vec![matrix]).instance_count(), 4);
    assert_eq!(Parallel::Count(3).instance_count(), 3);
}

#[test]
fn test_to_tree_round_trips_job_fields() {
    let mut pipeline = Pipeline::new();
    pipeline.add_stage("build").unwrap();
    pipeline
        .add_job(
            Job::new("compile")
                .with_stage("build")
                .with_script(vec!["make".to_string()])
                .with_variables([("TARGET", "release")].into_iter().collect()),
        )
        .unwrap();

    let tree = pipeline.to_tree();
    let job = tree.get("compile").expect("job present in tree");
    assert_eq!(job.get("stage").and_then(|v| v.as_str()), Some("build"));
    assert_eq!(
        job.get("variables")
            .and_then(|v| v.get("TARGET"))
            .and_then(|v| v.as_str()),
        Some("release")
    );
}
