// tests/failure_handling_test.rs
mod common;

use common::*;
use jobrun::core::{PipelineStatus, StepStatus};
use jobrun::report::RunReport;

#[tokio::test]
async fn failing_step_stops_the_chain_but_not_tolerant_steps() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: ci
steps:
  - name: lint
    run: echo "checking"
  - name: tests
    run: exit 4
  - name: package
    run: echo "never reached"
  - name: notify
    condition: on_failure
    run: echo "tests broke"
  - name: cleanup
    condition: always
    run: echo "cleaning"
"#,
    );

    let result = engine().execute(&pipeline).await;

    assert_eq!(result.status, PipelineStatus::Failed);
    // `package` was never launched and records nothing
    assert_eq!(
        outcome_steps(&result),
        vec!["lint", "tests", "notify", "cleanup"]
    );

    let tests = result.outcome("tests").unwrap();
    assert_eq!(tests.status, StepStatus::Failed);
    assert_eq!(tests.exit_code, Some(4));

    assert_eq!(
        result.outcome("notify").unwrap().status,
        StepStatus::Succeeded
    );
    assert_eq!(
        result.outcome("cleanup").unwrap().status,
        StepStatus::Succeeded
    );
    assert_eq!(result.first_failure().unwrap().step, "tests");
}

#[tokio::test]
async fn outcome_log_ends_at_the_first_required_failure() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: strict
steps:
  - name: a
    run: echo ok
  - name: b
    run: exit 1
  - name: c
    run: echo never
  - name: d
    run: echo never
"#,
    );

    let result = engine().execute(&pipeline).await;

    assert_eq!(result.status, PipelineStatus::Failed);
    assert_eq!(result.outcomes.len(), 2);
    assert_eq!(outcome_steps(&result), vec!["a", "b"]);
}

#[tokio::test]
async fn missing_binary_is_a_step_failure_without_exit_code() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: missing
steps:
  - name: ghost
    command: ["definitely-not-a-real-binary-3f9a"]
"#,
    );

    let result = engine().execute(&pipeline).await;

    assert_eq!(result.status, PipelineStatus::Failed);
    let ghost = result.outcome("ghost").unwrap();
    assert_eq!(ghost.status, StepStatus::Failed);
    assert_eq!(ghost.exit_code, None);
    assert!(ghost
        .message
        .as_deref()
        .unwrap_or("")
        .contains("failed to launch"));
}

#[tokio::test]
async fn on_failure_step_is_skipped_when_nothing_failed() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: healthy
steps:
  - name: build
    run: echo building
  - name: notify
    condition: on_failure
    run: echo "should not run"
"#,
    );

    let result = engine().execute(&pipeline).await;

    assert_eq!(result.status, PipelineStatus::Succeeded);
    let notify = result.outcome("notify").unwrap();
    assert_eq!(notify.status, StepStatus::Skipped);
    assert!(notify.stdout.is_empty());
}

#[tokio::test]
async fn run_report_names_the_first_failure() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: reported
steps:
  - name: lint
    run: echo fine
  - name: tests
    run: exit 3
"#,
    );

    let result = engine().execute(&pipeline).await;
    let report = RunReport::from_result(&result);

    assert_eq!(report.first_failure.as_deref(), Some("tests"));
    assert_eq!(report.steps.len(), 2);

    let json = report.to_json().unwrap();
    assert!(json.contains("\"status\": \"failed\""));
    assert!(json.contains("\"exit_code\": 3"));
}
