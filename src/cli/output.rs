//! CLI output formatting

use crate::{
    core::outcome::{PipelineResult, PipelineStatus, StepOutcome, StepStatus},
    persistence::RunRecord,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar sized for the pipeline's step count
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a step status for display
pub fn format_step_status(status: StepStatus) -> String {
    match status {
        StepStatus::Succeeded => style("SUCCEEDED").green().to_string(),
        StepStatus::Failed => style("FAILED").red().to_string(),
        StepStatus::TimedOut => style("TIMED OUT").red().to_string(),
        StepStatus::Cancelled => style("CANCELLED").yellow().to_string(),
        StepStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format a pipeline status for display
pub fn format_pipeline_status(status: PipelineStatus) -> String {
    match status {
        PipelineStatus::Succeeded => style("SUCCEEDED").green().to_string(),
        PipelineStatus::Failed => style("FAILED").red().to_string(),
        PipelineStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

fn step_icon(status: StepStatus) -> Emoji<'static, 'static> {
    match status {
        StepStatus::Succeeded => CHECK,
        StepStatus::Failed | StepStatus::TimedOut => CROSS,
        StepStatus::Cancelled => WARN,
        StepStatus::Skipped => INFO,
    }
}

/// Format one step outcome as a single summary line
pub fn format_outcome_line(outcome: &StepOutcome) -> String {
    let mut line = format!(
        "{} {} - {} ({})",
        step_icon(outcome.status),
        style(&outcome.step).bold(),
        format_step_status(outcome.status),
        format_duration(outcome.duration_ms)
    );
    if let Some(code) = outcome.exit_code {
        if code != 0 {
            line.push_str(&format!(" - exit {}", style(code).red()));
        }
    }
    if let Some(message) = &outcome.message {
        line.push_str(&format!(" - {}", style(message).dim()));
    }
    line
}

/// Format the end-of-run summary block
pub fn format_result_summary(result: &PipelineResult) -> String {
    let icon = match result.status {
        PipelineStatus::Succeeded => CHECK,
        PipelineStatus::Failed => CROSS,
        PipelineStatus::Cancelled => WARN,
    };

    let mut lines = vec![format!(
        "{} Pipeline {} {} in {}",
        icon,
        style(&result.pipeline).bold(),
        format_pipeline_status(result.status),
        format_duration(result.duration_ms)
    )];
    for outcome in &result.outcomes {
        lines.push(format!("  {}", format_outcome_line(outcome)));
    }
    if let Some(first) = result.first_failure() {
        lines.push(format!(
            "{} First failure: {}",
            CROSS,
            style(&first.step).red()
        ));
    }
    lines.join("\n")
}

/// Format a run record for history listings
pub fn format_run_record(record: &RunRecord) -> String {
    let icon = match record.status {
        PipelineStatus::Succeeded => CHECK,
        PipelineStatus::Failed => CROSS,
        PipelineStatus::Cancelled => WARN,
    };

    let mut line = format!(
        "{} {} - {} - {} - {} steps ({} ok, {} failed, {} skipped) - {}",
        icon,
        style(&record.run_id.to_string()[..8]).dim(),
        style(&record.pipeline_name).bold(),
        format_pipeline_status(record.status),
        record.steps_run,
        record.succeeded,
        record.failed,
        record.skipped,
        style(record.started_at.format("%Y-%m-%d %H:%M:%S UTC")).dim()
    );
    if let Some(step) = &record.first_failure {
        line.push_str(&format!(" - failed at {}", style(step).red()));
    }
    line
}

/// Format a millisecond duration for display
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}m {:02}s", ms / 60_000, (ms % 60_000) / 1000)
    }
}

/// Format step output for display, keeping only the last lines
pub fn format_output_tail(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let tail = lines[lines.len() - max_lines..].join("\n");
        format!(
            "{}\n{}",
            style(format!("[... {} earlier lines ...]", lines.len() - max_lines)).dim(),
            tail
        )
    }
}
