//! Pipeline execution

pub mod cancel;
pub mod capture;
pub mod engine;
pub mod runner;

pub use cancel::CancelSignal;
pub use capture::{CapturedOutput, OutputStream, DEFAULT_MAX_CAPTURE_BYTES, TRUNCATION_MARKER};
pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use runner::{LineSink, StepRunner, ENV_FILE_VAR};
