//! Persistence layer for pipeline run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteRunStore;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::outcome::{PipelineResult, PipelineStatus, StepStatus};

/// Compact record of one finished run, the unit of history storage.
/// Step output is deliberately not persisted; reports cover that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique run ID
    pub run_id: Uuid,

    /// Pipeline name
    pub pipeline_name: String,

    /// Terminal status of the run
    pub status: PipelineStatus,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Total wall-clock duration in milliseconds
    pub duration_ms: u64,

    /// Number of steps that recorded an outcome
    pub steps_run: usize,

    /// Steps that succeeded
    pub succeeded: usize,

    /// Steps that failed or timed out
    pub failed: usize,

    /// Steps skipped by their condition
    pub skipped: usize,

    /// Name of the first failed step, if any
    pub first_failure: Option<String>,
}

/// Trait for history backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save a finished run
    async fn save_run(&self, record: &RunRecord) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>>;

    /// List runs of a pipeline, most recent first
    async fn list_runs(&self, pipeline_name: &str) -> Result<Vec<RunRecord>>;

    /// List all pipeline names with stored runs
    async fn list_pipelines(&self) -> Result<Vec<String>>;
}

/// In-memory history (for testing or ephemeral use)
pub struct InMemoryRunStore {
    runs: tokio::sync::RwLock<std::collections::HashMap<Uuid, RunRecord>>,
    by_pipeline: tokio::sync::RwLock<std::collections::HashMap<String, Vec<Uuid>>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self {
            runs: tokio::sync::RwLock::new(std::collections::HashMap::new()),
            by_pipeline: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryRunStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryRunStore {
    async fn save_run(&self, record: &RunRecord) -> Result<()> {
        let mut runs = self.runs.write().await;
        runs.insert(record.run_id, record.clone());

        let mut by_pipeline = self.by_pipeline.write().await;
        by_pipeline
            .entry(record.pipeline_name.clone())
            .or_insert_with(Vec::new)
            .push(record.run_id);

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        let runs = self.runs.read().await;
        Ok(runs.get(&run_id).cloned())
    }

    async fn list_runs(&self, pipeline_name: &str) -> Result<Vec<RunRecord>> {
        let runs = self.runs.read().await;
        let by_pipeline = self.by_pipeline.read().await;

        let mut records = Vec::new();
        if let Some(ids) = by_pipeline.get(pipeline_name) {
            for id in ids {
                if let Some(record) = runs.get(id) {
                    records.push(record.clone());
                }
            }
        }
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let by_pipeline = self.by_pipeline.read().await;
        let mut names: Vec<String> = by_pipeline.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Build the history record for a finished run
pub fn create_record(result: &PipelineResult) -> RunRecord {
    RunRecord {
        run_id: result.run_id,
        pipeline_name: result.pipeline.clone(),
        status: result.status,
        started_at: result.started_at,
        duration_ms: result.duration_ms,
        steps_run: result.outcomes.len(),
        succeeded: result.count_with(StepStatus::Succeeded),
        failed: result.outcomes.iter().filter(|o| o.is_failure()).count(),
        skipped: result.count_with(StepStatus::Skipped),
        first_failure: result.first_failure().map(|o| o.step.clone()),
    }
}
