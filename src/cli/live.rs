//! Live terminal rendering of execution events
//!
//! Prints step headers, streamed output lines and per-step results as
//! they arrive. Used by `jobrun run --stream`; the default run path
//! shows a progress bar instead.

use std::io::{self, Write};

use console::style;

use crate::cli::output::{format_outcome_line, format_pipeline_status, ROCKET, SPINNER};
use crate::execution::{ExecutionEvent, OutputStream};

/// Prints execution events to stdout as they arrive
pub struct EventPrinter;

impl EventPrinter {
    pub fn new() -> Self {
        Self
    }

    /// Render one event
    pub fn print(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::PipelineStarted {
                run_id,
                pipeline_name,
                total_steps,
            } => {
                println!(
                    "{} Running pipeline {} ({}) - {} steps",
                    ROCKET,
                    style(pipeline_name).bold(),
                    style(&run_id.to_string()[..8]).dim(),
                    total_steps
                );
            }
            ExecutionEvent::StepStarted { index, total, step } => {
                self.print_separator();
                println!(
                    "{}[{}/{}] {}",
                    SPINNER,
                    style(index + 1).cyan(),
                    style(total).dim(),
                    style(step).bold()
                );
            }
            ExecutionEvent::StepOutput { stream, line, .. } => {
                match stream {
                    OutputStream::Stdout => println!("  {}", line),
                    OutputStream::Stderr => println!("  {}", style(line).red()),
                }
                self.flush_stdout();
            }
            ExecutionEvent::StepFinished { outcome } => {
                println!("{}", format_outcome_line(outcome));
            }
            ExecutionEvent::PipelineCompleted { status, .. } => {
                self.print_separator();
                println!("Pipeline {}", format_pipeline_status(*status));
            }
        }
    }

    /// Print a separator line
    ///
    /// A horizontal rule spanning the terminal width, 80 columns when
    /// the width cannot be determined.
    fn print_separator(&self) {
        let width = term_size::dimensions_stdout()
            .map(|(w, _)| w)
            .unwrap_or(80);
        println!("{}", "─".repeat(width));
    }

    /// Flush stdout so output appears without buffering delays
    fn flush_stdout(&self) {
        let _ = io::stdout().flush();
    }
}

impl Default for EventPrinter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::StepOutcome;
    use uuid::Uuid;

    #[test]
    fn output_events_do_not_panic() {
        let printer = EventPrinter::new();

        printer.print(&ExecutionEvent::PipelineStarted {
            run_id: Uuid::new_v4(),
            pipeline_name: "ci".to_string(),
            total_steps: 2,
        });
        printer.print(&ExecutionEvent::StepStarted {
            index: 0,
            total: 2,
            step: "lint".to_string(),
        });
        printer.print(&ExecutionEvent::StepOutput {
            step: "lint".to_string(),
            stream: OutputStream::Stdout,
            line: "checking".to_string(),
        });
        printer.print(&ExecutionEvent::StepOutput {
            step: "lint".to_string(),
            stream: OutputStream::Stderr,
            line: "warning: unused".to_string(),
        });
        printer.print(&ExecutionEvent::StepFinished {
            outcome: StepOutcome::skipped("coverage", "no earlier step failed"),
        });
    }

    #[test]
    fn separator_handles_unknown_terminal_width() {
        let printer = EventPrinter::new();

        // Width defaults to 80 when stdout is not a terminal
        printer.print_separator();
    }
}
