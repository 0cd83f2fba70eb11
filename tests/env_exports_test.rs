// tests/env_exports_test.rs
mod common;

use common::*;
use jobrun::core::PipelineStatus;

#[tokio::test]
async fn exported_variables_flow_to_later_steps() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: exports
steps:
  - name: version
    run: echo "VERSION=1.4.2" >> "$JOBRUN_ENV"
  - name: tag
    run: echo "tagging v$VERSION"
"#,
    );

    let result = engine().execute(&pipeline).await;

    assert_eq!(result.status, PipelineStatus::Succeeded);
    assert_eq!(
        result.outcome("version").unwrap().exports.get("VERSION"),
        Some(&"1.4.2".to_string())
    );
    assert!(result
        .outcome("tag")
        .unwrap()
        .stdout
        .contains("tagging v1.4.2"));
}

#[tokio::test]
async fn exports_from_a_failing_step_still_merge() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: partial
steps:
  - name: coverage
    run: |
      echo "COVERAGE_REPORT=target/cov.xml" >> "$JOBRUN_ENV"
      exit 2
  - name: upload
    condition: always
    run: echo "uploading ${{ COVERAGE_REPORT }}"
"#,
    );

    let result = engine().execute(&pipeline).await;

    assert_eq!(result.status, PipelineStatus::Failed);
    assert!(result
        .outcome("upload")
        .unwrap()
        .stdout
        .contains("uploading target/cov.xml"));
}

#[tokio::test]
async fn later_exports_override_earlier_ones() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: override
env:
  CHANNEL: nightly
steps:
  - name: pick
    run: echo "CHANNEL=stable" >> "$JOBRUN_ENV"
  - name: use
    run: echo "channel is $CHANNEL"
"#,
    );

    let result = engine().execute(&pipeline).await;

    assert_eq!(result.status, PipelineStatus::Succeeded);
    assert!(result
        .outcome("use")
        .unwrap()
        .stdout
        .contains("channel is stable"));
}

#[tokio::test]
async fn unknown_placeholders_resolve_empty() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: placeholders
steps:
  - name: probe
    run: echo "value=[${{ NOT_SET_ANYWHERE }}]"
"#,
    );

    let result = engine().execute(&pipeline).await;

    assert_eq!(result.status, PipelineStatus::Succeeded);
    assert!(result.outcome("probe").unwrap().stdout.contains("value=[]"));
}
