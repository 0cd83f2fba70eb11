//! JSON run reports for external collectors

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::outcome::{PipelineResult, PipelineStatus, StepStatus};
use crate::execution::capture::CapturedOutput;

/// Machine-readable summary of one pipeline run. Output text is the
/// redacted, bounded capture; secrets never reach this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub pipeline: String,
    pub run_id: Uuid,
    pub status: PipelineStatus,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Name of the first failed step, if any
    pub first_failure: Option<String>,
    pub steps: Vec<StepReport>,
}

/// Per-step entry in a run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "CapturedOutput::is_empty")]
    pub stdout: CapturedOutput,
    #[serde(default, skip_serializing_if = "CapturedOutput::is_empty")]
    pub stderr: CapturedOutput,
}

impl RunReport {
    pub fn from_result(result: &PipelineResult) -> Self {
        Self {
            pipeline: result.pipeline.clone(),
            run_id: result.run_id,
            status: result.status,
            started_at: result.started_at,
            duration_ms: result.duration_ms,
            first_failure: result.first_failure().map(|o| o.step.clone()),
            steps: result
                .outcomes
                .iter()
                .map(|outcome| StepReport {
                    name: outcome.step.clone(),
                    status: outcome.status,
                    exit_code: outcome.exit_code,
                    started_at: outcome.started_at,
                    duration_ms: outcome.duration_ms,
                    message: outcome.message.clone(),
                    stdout: outcome.stdout.clone(),
                    stderr: outcome.stderr.clone(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize run report")
    }

    /// Write the report as pretty JSON to the given path.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write run report to {}", path.display()))?;
        Ok(())
    }
}
