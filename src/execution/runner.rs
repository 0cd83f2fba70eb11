//! Step runner - launches and supervises one step process

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::core::{
    outcome::{StepOutcome, StepStatus},
    secrets::{Redactor, SecretStore},
    state::PipelineState,
    step::{CommandSpec, Step},
};
use crate::execution::cancel::CancelSignal;
use crate::execution::capture::{CapturedOutput, OutputBuffer, OutputStream};

/// Environment variable holding the path of the per-step export file.
/// Steps append `KEY=value` lines to it; the engine merges them into the
/// shared environment once the step finishes.
pub const ENV_FILE_VAR: &str = "JOBRUN_ENV";

/// Receives redacted output lines as the process produces them.
pub trait LineSink: Send + Sync {
    fn on_line(&self, stream: OutputStream, line: &str);
}

/// How the wait on a child process ended
enum WaitEnd {
    Exited(std::process::ExitStatus),
    Io(std::io::Error),
    DeadlineHit,
    CancelHit,
}

/// Runs a single step to completion and produces its outcome.
///
/// The runner is stateless across steps: it reads the pipeline state,
/// never writes it. Every path out of [`run`](StepRunner::run) yields a
/// `StepOutcome`; process-level problems (launch failure, timeout, kill)
/// become outcome statuses rather than errors.
pub struct StepRunner {
    max_capture_bytes: usize,
}

impl StepRunner {
    pub fn new(max_capture_bytes: usize) -> Self {
        Self { max_capture_bytes }
    }

    /// Execute one step against the current pipeline state.
    ///
    /// The sequence is: evaluate the run condition, merge the environment
    /// (shared state, then step env, then step secrets), spawn the
    /// process with piped output, stream and redact its lines into
    /// bounded buffers, wait with the step deadline while listening for
    /// cancellation, then collect exported variables from the step's
    /// `JOBRUN_ENV` file.
    pub async fn run(
        &self,
        step: &Step,
        state: &PipelineState,
        secrets: &SecretStore,
        sink: Option<Arc<dyn LineSink>>,
        cancel: &CancelSignal,
    ) -> StepOutcome {
        let started_at = Utc::now();
        let start = Instant::now();

        if cancel.is_cancelled() {
            info!("Step {} cancelled before launch", step.name);
            return StepOutcome {
                step: step.name.clone(),
                status: StepStatus::Cancelled,
                exit_code: None,
                stdout: CapturedOutput::default(),
                stderr: CapturedOutput::default(),
                exports: HashMap::new(),
                started_at,
                duration_ms: 0,
                message: Some("cancelled before launch".to_string()),
            };
        }

        if !step.condition.should_run(state) {
            let reason = if state.has_failed() {
                "an earlier step failed"
            } else {
                "no earlier step failed"
            };
            debug!("Skipping step {} ({})", step.name, reason);
            return StepOutcome::skipped(&step.name, reason);
        }

        info!("Running step: {}", step.name);

        let env = self.merged_env(step, state, secrets);
        let env_file = export_file_path(state, step);

        let mut cmd = match &step.command {
            CommandSpec::Shell(line) => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(state.expand(line));
                cmd
            }
            CommandSpec::Argv(argv) => {
                let mut cmd = Command::new(state.expand(&argv[0]));
                for arg in &argv[1..] {
                    cmd.arg(state.expand(arg));
                }
                cmd
            }
        };
        cmd.envs(&env)
            .env(ENV_FILE_VAR, &env_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Loaded secrets live in this process's environment; the child
        // must not inherit any the step did not put in its merged env.
        for name in secrets.names() {
            if !env.contains_key(name) {
                cmd.env_remove(name);
            }
        }
        if let Some(dir) = &step.workdir {
            cmd.current_dir(state.expand(&dir.to_string_lossy()));
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to launch step {}: {}", step.name, e);
                return StepOutcome::launch_failure(&step.name, started_at, &e);
            }
        };

        let redactor = secrets.redactor();
        let stdout_task = tokio::spawn(read_stream(
            child.stdout.take(),
            OutputStream::Stdout,
            redactor.clone(),
            sink.clone(),
            self.max_capture_bytes,
        ));
        let stderr_task = tokio::spawn(read_stream(
            child.stderr.take(),
            OutputStream::Stderr,
            redactor,
            sink,
            self.max_capture_bytes,
        ));

        let deadline = step.timeout_secs.map(Duration::from_secs);
        let end = tokio::select! {
            end = wait_child(&mut child, deadline) => end,
            _ = cancel.cancelled() => WaitEnd::CancelHit,
        };

        if matches!(end, WaitEnd::DeadlineHit | WaitEnd::CancelHit) {
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill step {}: {}", step.name, e);
            }
            // Reap so the readers see EOF and the child doesn't linger
            let _ = child.wait().await;
        }

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        let exports = read_exports(&env_file);
        let duration_ms = start.elapsed().as_millis() as u64;

        let (status, exit_code, message) = match end {
            WaitEnd::Exited(es) if es.success() => {
                info!("Step {} succeeded in {}ms", step.name, duration_ms);
                (StepStatus::Succeeded, es.code(), None)
            }
            WaitEnd::Exited(es) => {
                let message = match es.code() {
                    Some(code) => format!("exited with code {}", code),
                    None => "terminated by signal".to_string(),
                };
                warn!("Step {} failed: {}", step.name, message);
                (StepStatus::Failed, es.code(), Some(message))
            }
            WaitEnd::Io(e) => {
                error!("Wait failed for step {}: {}", step.name, e);
                (StepStatus::Failed, None, Some(format!("wait failed: {}", e)))
            }
            WaitEnd::DeadlineHit => {
                let secs = step.timeout_secs.unwrap_or_default();
                warn!("Step {} timed out after {}s", step.name, secs);
                (
                    StepStatus::TimedOut,
                    None,
                    Some(format!("timed out after {}s", secs)),
                )
            }
            WaitEnd::CancelHit => {
                warn!("Step {} cancelled", step.name);
                (StepStatus::Cancelled, None, Some("cancelled".to_string()))
            }
        };

        StepOutcome {
            step: step.name.clone(),
            status,
            exit_code,
            stdout,
            stderr,
            exports,
            started_at,
            duration_ms,
            message,
        }
    }

    /// Layered environment for a step: shared pipeline state first, then
    /// step-level env, then the step's secrets. Later layers win.
    fn merged_env(
        &self,
        step: &Step,
        state: &PipelineState,
        secrets: &SecretStore,
    ) -> HashMap<String, String> {
        let mut env = state.env().clone();
        for (key, value) in &step.env {
            env.insert(key.clone(), state.expand(value));
        }
        for name in &step.secrets {
            if let Some(value) = secrets.get(name) {
                env.insert(name.clone(), value.to_string());
            }
        }
        env
    }
}

async fn wait_child(child: &mut Child, deadline: Option<Duration>) -> WaitEnd {
    match deadline {
        Some(limit) => match timeout(limit, child.wait()).await {
            Ok(Ok(status)) => WaitEnd::Exited(status),
            Ok(Err(e)) => WaitEnd::Io(e),
            Err(_) => WaitEnd::DeadlineHit,
        },
        None => match child.wait().await {
            Ok(status) => WaitEnd::Exited(status),
            Err(e) => WaitEnd::Io(e),
        },
    }
}

async fn read_stream<R>(
    reader: Option<R>,
    stream: OutputStream,
    redactor: Redactor,
    sink: Option<Arc<dyn LineSink>>,
    limit: usize,
) -> CapturedOutput
where
    R: AsyncRead + Unpin,
{
    let mut buffer = OutputBuffer::new(limit);
    let reader = match reader {
        Some(reader) => reader,
        None => return buffer.into_captured(),
    };

    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = redactor.mask(&line);
        if let Some(sink) = &sink {
            sink.on_line(stream, &line);
        }
        buffer.push_line(line);
    }
    buffer.into_captured()
}

fn export_file_path(state: &PipelineState, step: &Step) -> PathBuf {
    let slug: String = step
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    std::env::temp_dir().join(format!("jobrun-env-{}-{}", state.run_id(), slug))
}

/// Parse `KEY=value` lines from the step's export file, then remove it.
/// A missing file just means the step exported nothing.
fn read_exports(path: &Path) -> HashMap<String, String> {
    let mut exports = HashMap::new();
    if let Ok(content) = std::fs::read_to_string(path) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                exports.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        let _ = std::fs::remove_file(path);
    }
    exports
}
