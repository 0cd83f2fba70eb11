use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use jobrun::cli::commands::{ListCommand, RunCommand, ValidateCommand};
use jobrun::cli::live::EventPrinter;
use jobrun::cli::output::{
    create_progress_bar, format_output_tail, format_result_summary, style, CHECK, CROSS, INFO,
    WARN,
};
use jobrun::cli::{Cli, Command};
use jobrun::core::config::PipelineConfig;
use jobrun::core::{PipelineResult, PipelineStatus, SecretStore};
use jobrun::execution::{ExecutionEngine, ExecutionEvent};
use jobrun::report::RunReport;

#[cfg(feature = "sqlite")]
use jobrun::cli::commands::HistoryCommand;
#[cfg(feature = "sqlite")]
use jobrun::cli::output::format_run_record;
#[cfg(feature = "sqlite")]
use jobrun::persistence::{create_record, PersistenceBackend, SqliteRunStore};
#[cfg(feature = "sqlite")]
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, cli.stream).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::List(cmd) => list_pipelines(cmd).await?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand, stream: bool) -> Result<()> {
    // Load pipeline definition
    let config = match PipelineConfig::from_file(&cmd.file) {
        Ok(config) => config,
        Err(e) => {
            println!("{} {}", CROSS, style(e).red());
            std::process::exit(2);
        }
    };

    println!(
        "{} Loaded pipeline: {} ({} steps)",
        INFO,
        style(&config.name).bold(),
        config.steps.len()
    );

    let mut pipeline = config.to_pipeline();

    // Apply environment overrides
    for (key, value) in &cmd.env {
        pipeline.env.insert(key.clone(), value.clone());
        println!(
            "{} Environment override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    // Resolve secrets before anything runs
    let secrets = match SecretStore::load(&pipeline.secret_names) {
        Ok(secrets) => secrets,
        Err(e) => {
            println!("{} {}", CROSS, style(e).red());
            std::process::exit(2);
        }
    };
    if !secrets.is_empty() {
        println!("{} Secrets resolved: {}", INFO, style(secrets.len()).cyan());
    }

    let mut engine = ExecutionEngine::new(secrets);

    // Ctrl-C cancels the in-flight step and stops the run
    let cancel = engine.cancel_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n{} Interrupt received, cancelling run", WARN);
            cancel.cancel();
        }
    });

    // Console rendering: streamed lines or a progress bar
    let progress = if stream {
        let printer = EventPrinter::new();
        engine.add_event_handler(move |event| printer.print(&event));
        None
    } else {
        let progress = create_progress_bar(pipeline.len());
        let bar = progress.clone();
        engine.add_event_handler(move |event| match event {
            ExecutionEvent::StepStarted { step, .. } => bar.set_message(step),
            ExecutionEvent::StepFinished { .. } => bar.inc(1),
            _ => {}
        });
        Some(progress)
    };

    println!();
    let result = engine.execute(&pipeline).await;

    if let Some(progress) = progress {
        progress.finish_and_clear();
        println!("{}", format_result_summary(&result));

        // Show the failing step's stderr tail; the stream mode already
        // printed it live
        if let Some(first) = result.first_failure() {
            if !first.stderr.is_empty() {
                println!("\n{} Output from {}:", INFO, style(&first.step).dim());
                println!("{}", format_output_tail(&first.stderr.render(), 20));
            }
        }
    }

    // Write the JSON report
    if let Some(path) = &cmd.report {
        let report = RunReport::from_result(&result);
        report.write_to(path)?;
        println!(
            "{} Report written to {}",
            INFO,
            style(path.display()).dim()
        );
    }

    // Save to history
    if !cmd.no_history {
        save_history(&result).await;
    }

    match result.status {
        PipelineStatus::Succeeded => {}
        PipelineStatus::Failed => std::process::exit(1),
        PipelineStatus::Cancelled => std::process::exit(130),
    }

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn save_history(result: &PipelineResult) {
    let record = create_record(result);
    match SqliteRunStore::with_default_path().await {
        Ok(store) => {
            if let Err(e) = store.save_run(&record).await {
                warn!("Failed to save run to history: {}", e);
            } else {
                println!(
                    "{} Run saved to history ({})",
                    INFO,
                    style(&record.run_id.to_string()[..8]).dim()
                );
            }
        }
        Err(e) => warn!("History store unavailable: {}", e),
    }
}

#[cfg(not(feature = "sqlite"))]
async fn save_history(_result: &PipelineResult) {}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    match PipelineConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Pipeline definition is valid", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Steps: {}", style(config.steps.len()).cyan());
            println!("  Secrets: {}", style(config.secrets.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(2);
        }
    }
}

#[cfg(feature = "sqlite")]
async fn list_pipelines(cmd: &ListCommand) -> Result<()> {
    let store = SqliteRunStore::with_default_path().await?;
    let pipelines = store.list_pipelines().await?;

    if pipelines.is_empty() {
        println!("{} No pipelines in history", INFO);
        return Ok(());
    }

    if cmd.json {
        let mut entries = Vec::new();
        for name in &pipelines {
            let runs = store.list_runs(name).await?;
            entries.push(serde_json::json!({
                "name": name,
                "runs": runs.len(),
            }));
        }
        let data = serde_json::json!({ "pipelines": entries });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Pipelines in history:", INFO);
    for name in &pipelines {
        if cmd.with_counts {
            let runs = store.list_runs(name).await?;
            let succeeded = runs
                .iter()
                .filter(|r| r.status == PipelineStatus::Succeeded)
                .count();
            let failed = runs
                .iter()
                .filter(|r| r.status == PipelineStatus::Failed)
                .count();
            println!(
                "  {} ({} runs: {} succeeded, {} failed)",
                style(name).bold(),
                style(runs.len()).cyan(),
                style(succeeded).green(),
                style(failed).red()
            );
        } else {
            println!("  {}", style(name).bold());
        }
    }

    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn list_pipelines(_cmd: &ListCommand) -> Result<()> {
    println!("{} Run history requires the sqlite feature", WARN);
    Ok(())
}

#[cfg(feature = "sqlite")]
async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = SqliteRunStore::with_default_path().await?;

    // A specific run by ID
    if let Some(run_id) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id).context("Invalid run ID format")?;
        match store.load_run(run_id).await? {
            Some(record) => {
                if cmd.json {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                } else {
                    println!("{}", format_run_record(&record));
                }
            }
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    // Runs of one pipeline, or the latest runs across all of them
    let records = if let Some(pipeline) = &cmd.pipeline {
        store.list_runs(pipeline).await?
    } else {
        let mut all = Vec::new();
        for name in store.list_pipelines().await? {
            all.extend(store.list_runs(&name).await?);
        }
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all
    };
    let records: Vec<_> = records.into_iter().take(cmd.limit).collect();

    if records.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    if cmd.json {
        let data = serde_json::json!({ "runs": records });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{} Run history (latest {}):", INFO, records.len());
        for record in &records {
            println!("  {}", format_run_record(record));
        }
    }

    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn show_history(_cmd: &jobrun::cli::commands::HistoryCommand) -> Result<()> {
    println!("{} Run history requires the sqlite feature", WARN);
    Ok(())
}
