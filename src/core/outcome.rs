//! Step and pipeline outcome records

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::execution::capture::CapturedOutput;

/// Terminal status of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Process exited with code 0
    Succeeded,
    /// Process exited non-zero, was killed by a signal, or failed to launch
    Failed,
    /// Process exceeded its deadline and was killed
    TimedOut,
    /// Pipeline was cancelled while the process ran
    Cancelled,
    /// Condition evaluated false; nothing was launched
    Skipped,
}

impl StepStatus {
    /// Whether this status makes the step a pipeline failure.
    /// Skipping is never a failure; cancellation is accounted separately.
    pub fn is_failure(&self) -> bool {
        matches!(self, StepStatus::Failed | StepStatus::TimedOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
            StepStatus::TimedOut => "timed_out",
            StepStatus::Cancelled => "cancelled",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one step attempt.
///
/// Produced exactly once per launched (or skipped-by-condition) step and
/// appended to the pipeline state in execution order. Output is already
/// redacted and size-bounded by the time it lands here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Name of the step this outcome belongs to
    pub step: String,

    /// Terminal status
    pub status: StepStatus,

    /// Process exit code, when the process ran and exited on its own
    pub exit_code: Option<i32>,

    /// Captured stdout, redacted, bounded
    pub stdout: CapturedOutput,

    /// Captured stderr, redacted, bounded
    pub stderr: CapturedOutput,

    /// Variables the step exported for later steps
    pub exports: HashMap<String, String>,

    /// When the step started (or was skipped)
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,

    /// Human-readable reason for skips and failures
    pub message: Option<String>,
}

impl StepOutcome {
    /// Outcome for a step whose condition evaluated false.
    pub fn skipped(step: &str, reason: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            status: StepStatus::Skipped,
            exit_code: None,
            stdout: CapturedOutput::default(),
            stderr: CapturedOutput::default(),
            exports: HashMap::new(),
            started_at: Utc::now(),
            duration_ms: 0,
            message: Some(reason.into()),
        }
    }

    /// Outcome for a step whose process could not be spawned at all.
    pub fn launch_failure(step: &str, started_at: DateTime<Utc>, error: &std::io::Error) -> Self {
        Self {
            step: step.to_string(),
            status: StepStatus::Failed,
            exit_code: None,
            stdout: CapturedOutput::default(),
            stderr: CapturedOutput::default(),
            exports: HashMap::new(),
            started_at,
            duration_ms: 0,
            message: Some(format!("failed to launch: {}", error)),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}

/// Terminal status of a whole pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Every launched step succeeded or was skipped
    Succeeded,
    /// At least one step failed or timed out
    Failed,
    /// The run was cancelled before it could finish
    Cancelled,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Succeeded => "succeeded",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "succeeded" => Some(PipelineStatus::Succeeded),
            "failed" => Some(PipelineStatus::Failed),
            "cancelled" => Some(PipelineStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a full pipeline run: overall status plus the ordered
/// per-step outcomes. Steps that were never launched because the
/// pipeline had already failed (or was cancelled) have no entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Run ID shared with events, reports and history
    pub run_id: Uuid,

    /// Pipeline name from the definition
    pub pipeline: String,

    /// Overall status
    pub status: PipelineStatus,

    /// Outcomes in execution order
    pub outcomes: Vec<StepOutcome>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Total wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Succeeded
    }

    /// Name of the first step that failed or timed out, if any.
    pub fn first_failure(&self) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.is_failure())
    }

    /// Outcome for a step by name, if the step was launched.
    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.step == step)
    }

    pub fn count_with(&self, status: StepStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}
