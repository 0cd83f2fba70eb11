//! Command-line interface

pub mod commands;
pub mod live;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{HistoryCommand, ListCommand, RunCommand, ValidateCommand};

/// Sequential CI job runner
#[derive(Debug, Parser, Clone)]
#[command(name = "jobrun")]
#[command(version = "0.1.0")]
#[command(about = "Run a YAML-defined job of sequential steps", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Stream step output lines instead of showing a progress bar
    #[arg(short, long, global = true)]
    pub stream: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a pipeline
    Run(RunCommand),

    /// Validate a pipeline definition without running it
    Validate(ValidateCommand),

    /// List pipelines with recorded runs
    List(ListCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
