//! CLI command definitions

use clap::Args;
use std::path::PathBuf;

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Environment overrides (key=value)
    #[arg(short, long, value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Write a JSON run report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,
}

/// Validate a pipeline definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List pipelines with recorded runs
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Show run counts per pipeline
    #[arg(long)]
    pub with_counts: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Pipeline name to filter by
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a single run by ID
    #[arg(long)]
    pub run_id: Option<String>,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
