//! Pipeline configuration from YAML

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::condition::RunCondition;
use crate::core::Pipeline;

/// Problems that make a pipeline definition unusable. All of these are
/// detected before any step process is launched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read pipeline file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pipeline YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("pipeline name must not be empty")]
    EmptyPipelineName,

    #[error("step name must not be empty")]
    EmptyStepName,

    #[error("duplicate step name '{0}'")]
    DuplicateStep(String),

    #[error("step '{0}' must set exactly one of `run` or `command`")]
    AmbiguousCommand(String),

    #[error("step '{0}' has an empty command")]
    EmptyCommand(String),

    #[error("step '{step}' references undeclared secret '{name}'")]
    UndeclaredSecret { step: String, name: String },

    #[error("secret '{0}' is not set in the environment")]
    MissingSecret(String),
}

/// Top-level pipeline definition loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Environment variables shared by every step
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Names of secrets the pipeline may use. Values are resolved from
    /// the runner's process environment, never from this file.
    #[serde(default)]
    pub secrets: Vec<String>,

    /// Working directory for all steps (overridable per step)
    #[serde(default)]
    pub workdir: Option<PathBuf>,

    /// Default timeout for steps in seconds (None = no deadline)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,

    /// Per-stream output capture limit in bytes
    #[serde(default)]
    pub max_capture_bytes: Option<usize>,

    /// Ordered list of steps
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// Step definition as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Unique step name
    pub name: String,

    /// Shell command line, executed via `sh -c`
    #[serde(default)]
    pub run: Option<String>,

    /// Argv vector, executed without a shell
    #[serde(default)]
    pub command: Option<Vec<String>>,

    /// Step-level environment, overrides pipeline env on key conflicts
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Secrets injected into this step's environment, by name
    #[serde(default)]
    pub secrets: Vec<String>,

    /// When this step runs relative to earlier failures
    #[serde(default)]
    pub condition: RunCondition,

    /// Timeout in seconds (overrides the pipeline default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Working directory (overrides the pipeline workdir)
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

impl PipelineConfig {
    /// Load a pipeline definition from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a pipeline definition from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the definition: unique non-empty step names, exactly one
    /// command form per step, step secrets declared at pipeline level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyPipelineName);
        }

        let declared: HashSet<&str> = self.secrets.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.name.trim().is_empty() {
                return Err(ConfigError::EmptyStepName);
            }
            if !seen.insert(step.name.as_str()) {
                return Err(ConfigError::DuplicateStep(step.name.clone()));
            }

            match (&step.run, &step.command) {
                (Some(run), None) => {
                    if run.trim().is_empty() {
                        return Err(ConfigError::EmptyCommand(step.name.clone()));
                    }
                }
                (None, Some(argv)) => {
                    if argv.is_empty() || argv[0].trim().is_empty() {
                        return Err(ConfigError::EmptyCommand(step.name.clone()));
                    }
                }
                _ => return Err(ConfigError::AmbiguousCommand(step.name.clone())),
            }

            for name in &step.secrets {
                if !declared.contains(name.as_str()) {
                    return Err(ConfigError::UndeclaredSecret {
                        step: step.name.clone(),
                        name: name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Convert the validated config into the Pipeline domain model
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::from_config(self)
    }
}
