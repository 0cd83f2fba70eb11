// tests/cancellation_test.rs
mod common;

use common::*;
use jobrun::core::{PipelineStatus, StepStatus};
use std::time::{Duration, Instant};

#[tokio::test]
async fn cancelling_kills_the_running_step_and_stops_the_pipeline() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: cancel-me
steps:
  - name: long-haul
    run: sleep 30
  - name: after
    run: echo "never"
  - name: cleanup
    condition: always
    run: echo "never either"
"#,
    );

    let engine = engine();
    let cancel = engine.cancel_signal();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
    });

    let start = Instant::now();
    let result = engine.execute(&pipeline).await;

    assert!(
        start.elapsed() < Duration::from_secs(10),
        "child was not killed promptly"
    );
    assert_eq!(result.status, PipelineStatus::Cancelled);
    // Nothing after the cancelled step runs, `always` included
    assert_eq!(outcome_steps(&result), vec!["long-haul"]);
    assert_eq!(result.outcomes[0].status, StepStatus::Cancelled);
}

#[tokio::test]
async fn cancellation_before_start_runs_nothing() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: never
steps:
  - name: a
    run: echo hi
"#,
    );

    let engine = engine();
    engine.cancel_signal().cancel();
    let result = engine.execute(&pipeline).await;

    assert_eq!(result.status, PipelineStatus::Cancelled);
    assert!(result.outcomes.is_empty());
}

#[tokio::test]
async fn per_step_timeout_kills_the_child() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: deadline
steps:
  - name: stuck
    run: sleep 30
    timeout_secs: 1
  - name: after
    run: echo "not reached"
"#,
    );

    let start = Instant::now();
    let result = engine().execute(&pipeline).await;

    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(result.status, PipelineStatus::Failed);
    let stuck = result.outcome("stuck").unwrap();
    assert_eq!(stuck.status, StepStatus::TimedOut);
    assert!(result.outcome("after").is_none());
}

#[tokio::test]
async fn pipeline_default_timeout_applies_to_steps() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: default-deadline
default_timeout_secs: 1
steps:
  - name: stuck
    run: sleep 30
"#,
    );

    let start = Instant::now();
    let result = engine().execute(&pipeline).await;

    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(
        result.outcome("stuck").unwrap().status,
        StepStatus::TimedOut
    );
}
