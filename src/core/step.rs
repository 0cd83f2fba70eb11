//! Step domain model

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::condition::RunCondition;
use crate::core::config::StepConfig;

/// How a step's process is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSpec {
    /// A shell command line, run via `sh -c`
    Shell(String),
    /// An argv vector, run without shell interpretation
    Argv(Vec<String>),
}

impl CommandSpec {
    /// One-line rendering for logs and summaries.
    pub fn display(&self) -> String {
        match self {
            CommandSpec::Shell(line) => line.clone(),
            CommandSpec::Argv(argv) => argv.join(" "),
        }
    }

    /// Program name, for log context.
    pub fn program(&self) -> &str {
        match self {
            CommandSpec::Shell(_) => "sh",
            CommandSpec::Argv(argv) => argv.first().map(String::as_str).unwrap_or(""),
        }
    }
}

/// A single step in a pipeline.
///
/// Steps are immutable once the pipeline is built; everything that
/// changes during a run lives in outcomes and the pipeline state.
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique step name within the pipeline
    pub name: String,

    /// The external command this step wraps
    pub command: CommandSpec,

    /// Step-level environment, overrides shared env on key conflicts
    pub env: HashMap<String, String>,

    /// Names of secrets injected into this step only
    pub secrets: Vec<String>,

    /// When this step runs relative to earlier failures
    pub condition: RunCondition,

    /// Deadline in seconds, if any
    pub timeout_secs: Option<u64>,

    /// Working directory, already resolved against the pipeline default
    pub workdir: Option<PathBuf>,
}

/// Pipeline-level defaults applied while building steps
#[derive(Debug, Clone, Default)]
pub struct StepDefaults {
    pub timeout_secs: Option<u64>,
    pub workdir: Option<PathBuf>,
}

impl Step {
    /// Build a step from its validated config, filling gaps from the
    /// pipeline defaults. Assumes `PipelineConfig::validate` passed, so
    /// exactly one command form is present.
    pub fn from_config(config: &StepConfig, defaults: &StepDefaults) -> Self {
        let command = match (&config.run, &config.command) {
            (Some(line), _) => CommandSpec::Shell(line.clone()),
            (None, Some(argv)) => CommandSpec::Argv(argv.clone()),
            (None, None) => CommandSpec::Shell(String::new()),
        };

        Step {
            name: config.name.clone(),
            command,
            env: config.env.clone(),
            secrets: config.secrets.clone(),
            condition: config.condition,
            timeout_secs: config.timeout_secs.or(defaults.timeout_secs),
            workdir: config.workdir.clone().or_else(|| defaults.workdir.clone()),
        }
    }
}
