//! Pipeline domain model

use std::collections::HashMap;
use std::path::PathBuf;

use crate::core::config::PipelineConfig;
use crate::core::step::{Step, StepDefaults};
use crate::execution::capture::DEFAULT_MAX_CAPTURE_BYTES;

/// An ordered pipeline definition. Execution order is the order steps
/// were written in; there is no dependency graph.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Environment shared by every step, before any exports
    pub env: HashMap<String, String>,

    /// Names of every secret the pipeline may use
    pub secret_names: Vec<String>,

    /// Working directory default for steps
    pub workdir: Option<PathBuf>,

    /// Per-stream output capture limit in bytes
    pub max_capture_bytes: usize,

    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl Pipeline {
    /// Build a pipeline from its validated configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        let defaults = StepDefaults {
            timeout_secs: config.default_timeout_secs,
            workdir: config.workdir.clone(),
        };

        let steps = config
            .steps
            .iter()
            .map(|step_config| Step::from_config(step_config, &defaults))
            .collect();

        Pipeline {
            name: config.name.clone(),
            env: config.env.clone(),
            secret_names: config.secrets.clone(),
            workdir: config.workdir.clone(),
            max_capture_bytes: config.max_capture_bytes.unwrap_or(DEFAULT_MAX_CAPTURE_BYTES),
            steps,
        }
    }

    /// Look up a step by name
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
