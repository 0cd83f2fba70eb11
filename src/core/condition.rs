//! Step run conditions

use serde::{Deserialize, Serialize};

use crate::core::state::PipelineState;

/// When a step is allowed to start, relative to the pipeline so far.
///
/// Conditions are a closed set of tags rather than a predicate language;
/// they are evaluated against the live [`PipelineState`] just before the
/// step would launch. Cancellation overrides every condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunCondition {
    /// Run only while no earlier required step has failed (the default).
    #[default]
    OnSuccess,

    /// Run regardless of earlier failures (cleanup, report upload).
    Always,

    /// Run only after some earlier required step has failed.
    OnFailure,
}

impl RunCondition {
    /// Whether a step with this condition should run given the pipeline
    /// state accumulated so far.
    pub fn should_run(&self, state: &PipelineState) -> bool {
        if state.is_cancelled() {
            return false;
        }
        match self {
            RunCondition::OnSuccess => !state.has_failed(),
            RunCondition::Always => true,
            RunCondition::OnFailure => state.has_failed(),
        }
    }

    /// Whether the engine should still hand this step to the runner once
    /// the pipeline has a terminal failure. Steps that answer `false` are
    /// never launched after that point and record no outcome.
    pub fn runs_after_failure(&self) -> bool {
        matches!(self, RunCondition::Always | RunCondition::OnFailure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunCondition::OnSuccess => "on_success",
            RunCondition::Always => "always",
            RunCondition::OnFailure => "on_failure",
        }
    }
}

impl std::fmt::Display for RunCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn healthy_state() -> PipelineState {
        PipelineState::new(HashMap::new())
    }

    fn failed_state() -> PipelineState {
        let mut state = PipelineState::new(HashMap::new());
        state.note_failure();
        state
    }

    #[test]
    fn test_on_success_runs_only_without_failure() {
        assert!(RunCondition::OnSuccess.should_run(&healthy_state()));
        assert!(!RunCondition::OnSuccess.should_run(&failed_state()));
    }

    #[test]
    fn test_always_runs_either_way() {
        assert!(RunCondition::Always.should_run(&healthy_state()));
        assert!(RunCondition::Always.should_run(&failed_state()));
    }

    #[test]
    fn test_on_failure_runs_only_after_failure() {
        assert!(!RunCondition::OnFailure.should_run(&healthy_state()));
        assert!(RunCondition::OnFailure.should_run(&failed_state()));
    }

    #[test]
    fn test_cancellation_blocks_every_condition() {
        let mut state = healthy_state();
        state.note_cancelled();
        assert!(!RunCondition::OnSuccess.should_run(&state));
        assert!(!RunCondition::Always.should_run(&state));
        assert!(!RunCondition::OnFailure.should_run(&state));
    }

    #[test]
    fn test_parses_from_snake_case() {
        let cond: RunCondition = serde_yaml::from_str("always").unwrap();
        assert_eq!(cond, RunCondition::Always);
        let cond: RunCondition = serde_yaml::from_str("on_failure").unwrap();
        assert_eq!(cond, RunCondition::OnFailure);
    }

    #[test]
    fn test_default_is_on_success() {
        assert_eq!(RunCondition::default(), RunCondition::OnSuccess);
    }
}
