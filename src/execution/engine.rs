//! Execution engine - drives a pipeline run from first step to result

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::{
    outcome::{PipelineResult, PipelineStatus, StepOutcome, StepStatus},
    pipeline::Pipeline,
    secrets::SecretStore,
    state::PipelineState,
};
use crate::execution::cancel::CancelSignal;
use crate::execution::capture::OutputStream;
use crate::execution::runner::{LineSink, StepRunner};

/// Events emitted while a pipeline runs
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline_name: String,
        total_steps: usize,
    },
    StepStarted {
        index: usize,
        total: usize,
        step: String,
    },
    /// One redacted output line, forwarded live
    StepOutput {
        step: String,
        stream: OutputStream,
        line: String,
    },
    StepFinished {
        outcome: StepOutcome,
    },
    PipelineCompleted {
        run_id: Uuid,
        status: PipelineStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Forwards a step's live output lines to the engine's event handlers.
struct StepEventSink {
    handlers: Vec<EventHandler>,
    step: String,
}

impl LineSink for StepEventSink {
    fn on_line(&self, stream: OutputStream, line: &str) {
        let event = ExecutionEvent::StepOutput {
            step: self.step.clone(),
            stream,
            line: line.to_string(),
        };
        for handler in &self.handlers {
            handler(event.clone());
        }
    }
}

/// Runs pipelines strictly in step order.
///
/// One step at a time, no overlap. After a required step fails, only
/// steps whose condition tolerates failure are still handed to the
/// runner; the rest are dropped without an outcome. Cancellation stops
/// everything, including `always` steps.
pub struct ExecutionEngine {
    secrets: SecretStore,
    cancel: CancelSignal,
    event_handlers: Vec<EventHandler>,
}

impl ExecutionEngine {
    pub fn new(secrets: SecretStore) -> Self {
        Self {
            secrets,
            cancel: CancelSignal::new(),
            event_handlers: Vec::new(),
        }
    }

    /// Handle to the engine's cancellation signal, for ctrl-c wiring.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Add an event handler. Handlers run inline on the engine task and
    /// should return quickly.
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    fn emit(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute the pipeline and return its result. A pipeline with zero
    /// steps succeeds with an empty outcome log.
    pub async fn execute(&self, pipeline: &Pipeline) -> PipelineResult {
        let mut state = PipelineState::new(pipeline.env.clone());
        let run_id = state.run_id();
        let started_at = state.started_at();
        let start = Instant::now();
        let total = pipeline.len();

        info!("Starting pipeline run: {} ({})", pipeline.name, run_id);
        self.emit(ExecutionEvent::PipelineStarted {
            run_id,
            pipeline_name: pipeline.name.clone(),
            total_steps: total,
        });

        let runner = StepRunner::new(pipeline.max_capture_bytes);
        let mut cancelled = false;

        for (index, step) in pipeline.steps.iter().enumerate() {
            if self.cancel.is_cancelled() || state.is_cancelled() {
                warn!("Run cancelled, dropping remaining steps");
                cancelled = true;
                break;
            }

            if state.has_failed() && !step.condition.runs_after_failure() {
                debug!("Not launching step {} (pipeline already failed)", step.name);
                continue;
            }

            self.emit(ExecutionEvent::StepStarted {
                index,
                total,
                step: step.name.clone(),
            });

            let sink: Option<Arc<dyn LineSink>> = if self.event_handlers.is_empty() {
                None
            } else {
                Some(Arc::new(StepEventSink {
                    handlers: self.event_handlers.clone(),
                    step: step.name.clone(),
                }))
            };

            let outcome = runner
                .run(step, &state, &self.secrets, sink, &self.cancel)
                .await;
            self.emit(ExecutionEvent::StepFinished {
                outcome: outcome.clone(),
            });

            let step_cancelled = outcome.status == StepStatus::Cancelled;
            state.record(outcome);
            if step_cancelled {
                cancelled = true;
                break;
            }
        }

        let status = if cancelled || state.is_cancelled() {
            PipelineStatus::Cancelled
        } else if state.has_failed() {
            PipelineStatus::Failed
        } else {
            PipelineStatus::Succeeded
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("Pipeline run finished: {} - {}", pipeline.name, status);
        self.emit(ExecutionEvent::PipelineCompleted { run_id, status });

        PipelineResult {
            run_id,
            pipeline: pipeline.name.clone(),
            status,
            outcomes: state.into_outcomes(),
            started_at,
            duration_ms,
        }
    }
}
