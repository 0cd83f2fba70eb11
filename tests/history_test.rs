// tests/history_test.rs
#![cfg(feature = "sqlite")]

mod common;

use common::*;
use jobrun::core::PipelineStatus;
use jobrun::persistence::{create_record, PersistenceBackend, SqliteRunStore};

#[tokio::test]
async fn finished_runs_round_trip_through_the_store() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: recorded
steps:
  - name: only
    run: echo done
"#,
    );

    let result = engine().execute(&pipeline).await;
    assert_eq!(result.status, PipelineStatus::Succeeded);

    let store = SqliteRunStore::new(":memory:").await.unwrap();
    let record = create_record(&result);
    store.save_run(&record).await.unwrap();

    let loaded = store.load_run(result.run_id).await.unwrap().unwrap();
    assert_eq!(loaded.pipeline_name, "recorded");
    assert_eq!(loaded.status, PipelineStatus::Succeeded);
    assert_eq!(loaded.steps_run, 1);
    assert_eq!(loaded.succeeded, 1);
    assert_eq!(loaded.failed, 0);

    assert_eq!(store.list_pipelines().await.unwrap(), vec!["recorded"]);
}

#[tokio::test]
async fn failed_runs_record_their_first_failure() {
    setup_tracing();
    let pipeline = pipeline_from_yaml(
        r#"
name: broken
steps:
  - name: lint
    run: echo fine
  - name: tests
    run: exit 1
  - name: cleanup
    condition: always
    run: echo tidy
"#,
    );

    let result = engine().execute(&pipeline).await;
    let record = create_record(&result);

    assert_eq!(record.status, PipelineStatus::Failed);
    assert_eq!(record.steps_run, 3);
    assert_eq!(record.succeeded, 2);
    assert_eq!(record.failed, 1);
    assert_eq!(record.first_failure.as_deref(), Some("tests"));

    let store = SqliteRunStore::new(":memory:").await.unwrap();
    store.save_run(&record).await.unwrap();

    let runs = store.list_runs("broken").await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].first_failure.as_deref(), Some("tests"));
}
