//! Live pipeline run state

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::core::outcome::{StepOutcome, StepStatus};

/// Matches `${{ NAME }}` placeholders in commands, env values and paths.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Accumulated state of a running pipeline: the ordered outcomes so far
/// plus the shared environment steps read from and export into.
///
/// Only the engine mutates this, strictly between steps. The runner sees
/// it read-only while a step executes.
#[derive(Debug, Clone)]
pub struct PipelineState {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    env: HashMap<String, String>,
    outcomes: Vec<StepOutcome>,
    failed: bool,
    cancelled: bool,
}

impl PipelineState {
    /// Fresh state seeded with the pipeline-level environment.
    pub fn new(initial_env: HashMap<String, String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            env: initial_env,
            outcomes: Vec::new(),
            failed: false,
            cancelled: false,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Shared environment: pipeline env plus everything exported so far.
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    /// A required step has failed or timed out.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// The run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn note_failure(&mut self) {
        self.failed = true;
    }

    pub fn note_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Record a finished step: append the outcome in order, merge its
    /// exports into the shared environment and update the terminal flags.
    pub fn record(&mut self, outcome: StepOutcome) {
        for (key, value) in &outcome.exports {
            self.env.insert(key.clone(), value.clone());
        }
        if outcome.is_failure() {
            self.failed = true;
        }
        if outcome.status == StepStatus::Cancelled {
            self.cancelled = true;
        }
        self.outcomes.push(outcome);
    }

    /// Replace `${{ NAME }}` placeholders with values from the shared
    /// environment. Unknown names expand to the empty string.
    pub fn expand(&self, input: &str) -> String {
        PLACEHOLDER
            .replace_all(input, |caps: &regex::Captures<'_>| {
                self.env.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned()
    }

    pub fn into_outcomes(self) -> Vec<StepOutcome> {
        self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::capture::CapturedOutput;

    fn outcome_with_exports(step: &str, status: StepStatus, exports: &[(&str, &str)]) -> StepOutcome {
        StepOutcome {
            step: step.to_string(),
            status,
            exit_code: Some(0),
            stdout: CapturedOutput::default(),
            stderr: CapturedOutput::default(),
            exports: exports
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            started_at: Utc::now(),
            duration_ms: 0,
            message: None,
        }
    }

    #[test]
    fn test_record_merges_exports() {
        let mut state = PipelineState::new(HashMap::from([(
            "CI".to_string(),
            "true".to_string(),
        )]));
        state.record(outcome_with_exports(
            "coverage",
            StepStatus::Succeeded,
            &[("REPORT", "lcov.info")],
        ));

        assert_eq!(state.env().get("CI").map(String::as_str), Some("true"));
        assert_eq!(
            state.env().get("REPORT").map(String::as_str),
            Some("lcov.info")
        );
        assert_eq!(state.outcomes().len(), 1);
    }

    #[test]
    fn test_later_export_overrides_earlier() {
        let mut state = PipelineState::new(HashMap::new());
        state.record(outcome_with_exports("a", StepStatus::Succeeded, &[("V", "1")]));
        state.record(outcome_with_exports("b", StepStatus::Succeeded, &[("V", "2")]));
        assert_eq!(state.env().get("V").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_failure_flag_set_by_failed_outcome() {
        let mut state = PipelineState::new(HashMap::new());
        assert!(!state.has_failed());
        state.record(outcome_with_exports("lint", StepStatus::Failed, &[]));
        assert!(state.has_failed());
    }

    #[test]
    fn test_skip_does_not_fail_the_run() {
        let mut state = PipelineState::new(HashMap::new());
        state.record(outcome_with_exports("bench", StepStatus::Skipped, &[]));
        assert!(!state.has_failed());
    }

    #[test]
    fn test_expand_replaces_known_placeholders() {
        let mut state = PipelineState::new(HashMap::new());
        state.record(outcome_with_exports(
            "coverage",
            StepStatus::Succeeded,
            &[("REPORT", "lcov.info")],
        ));
        assert_eq!(
            state.expand("upload ${{ REPORT }} now"),
            "upload lcov.info now"
        );
        assert_eq!(state.expand("${{REPORT}}"), "lcov.info");
    }

    #[test]
    fn test_expand_unknown_placeholder_is_empty() {
        let state = PipelineState::new(HashMap::new());
        assert_eq!(state.expand("x${{ MISSING }}y"), "xy");
    }

    #[test]
    fn test_expand_leaves_plain_text_alone() {
        let state = PipelineState::new(HashMap::new());
        assert_eq!(state.expand("echo $HOME ${not_a_placeholder}"),
            "echo $HOME ${not_a_placeholder}");
    }
}
