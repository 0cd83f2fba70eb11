//! jobrun - sequential CI job runner
//!
//! Loads a YAML pipeline definition, runs its steps strictly in order,
//! and maps the result to a process exit code. Fail-fast by default,
//! with per-step run conditions, secret injection and redaction, and
//! bounded output capture.

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod report;

// Re-export commonly used types
pub use crate::core::config::{ConfigError, PipelineConfig};
pub use crate::core::{
    Pipeline, PipelineResult, PipelineStatus, RunCondition, SecretStore, Step, StepOutcome,
    StepStatus,
};
pub use crate::execution::{CancelSignal, ExecutionEngine, ExecutionEvent, StepRunner};
pub use crate::report::RunReport;
