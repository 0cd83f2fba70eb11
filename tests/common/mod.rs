// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jobrun::core::config::PipelineConfig;
use jobrun::core::{Pipeline, PipelineResult, SecretStore};
use jobrun::execution::{ExecutionEngine, ExecutionEvent};

/// Parse an inline YAML definition into a ready-to-run pipeline.
pub fn pipeline_from_yaml(yaml: &str) -> Pipeline {
    PipelineConfig::from_yaml(yaml)
        .expect("test pipeline should be valid")
        .to_pipeline()
}

/// Engine with no secrets and no event handlers.
pub fn engine() -> ExecutionEngine {
    ExecutionEngine::new(SecretStore::empty())
}

/// Engine with the given secret values preloaded.
pub fn engine_with_secrets(values: &[(&str, &str)]) -> ExecutionEngine {
    let map: HashMap<String, String> = values
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ExecutionEngine::new(SecretStore::from_values(map))
}

/// Register a handler that copies every event into a shared log.
pub fn event_log(engine: &mut ExecutionEngine) -> Arc<Mutex<Vec<ExecutionEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event));
    log
}

/// Names of the steps that recorded an outcome, in order.
pub fn outcome_steps(result: &PipelineResult) -> Vec<String> {
    result.outcomes.iter().map(|o| o.step.clone()).collect()
}

// --- Tracing setup (once per test binary) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
});

pub fn setup_tracing() {
    Lazy::force(&TRACING_INIT);
}
