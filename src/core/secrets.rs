//! Secret loading and output redaction

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::core::config::ConfigError;

/// Replacement text for redacted secret values.
pub const MASK: &str = "***";

/// Secret values resolved once from the parent process environment,
/// before the first step runs. Steps receive a secret only when they
/// name it; values never appear in logs, captures or reports.
#[derive(Debug, Default)]
pub struct SecretStore {
    values: HashMap<String, String>,
}

impl SecretStore {
    /// Store with no secrets at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve every declared secret from the process environment.
    /// A missing variable is a configuration error: the pipeline must
    /// not start half-provisioned.
    pub fn load(names: &[String]) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for name in names {
            match std::env::var(name) {
                Ok(value) => {
                    debug!(secret = %name, "loaded secret from environment");
                    values.insert(name.clone(), value);
                }
                Err(_) => return Err(ConfigError::MissingSecret(name.clone())),
            }
        }
        Ok(Self { values })
    }

    /// Build a store from explicit values. Used by tests and embedders.
    pub fn from_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Names of every loaded secret, for scrubbing child environments.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A cheap clone-able masker over every loaded value, safe to hand
    /// to per-stream reader tasks.
    pub fn redactor(&self) -> Redactor {
        Redactor {
            values: Arc::new(
                self.values
                    .values()
                    .filter(|v| !v.is_empty())
                    .cloned()
                    .collect(),
            ),
        }
    }
}

/// Masks secret values in output lines before they are stored or shown.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    values: Arc<Vec<String>>,
}

impl Redactor {
    /// Replace every occurrence of every secret value with [`MASK`].
    pub fn mask(&self, input: &str) -> String {
        let mut out = input.to_string();
        for value in self.values.iter() {
            if out.contains(value.as_str()) {
                out = out.replace(value.as_str(), MASK);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
