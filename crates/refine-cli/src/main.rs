use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use refine_core::app::help;
use refine_core::ports::TaskLogStore;
use refine_core::{AppBuilder, DispatchOutcome, DispatchRequest, RefineConfig, RefineError};

const DEFAULT_CONFIG: &str = "refine.toml";

/// Run named tasks from the command line or cron.
#[derive(Parser)]
#[command(name = "refine")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (default: ./refine.toml if present)
    #[arg(short, long, env = "REFINE_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database holding the task log
    #[arg(long, env = "REFINE_DB")]
    db: Option<PathBuf>,

    /// Lock and record runs in the task log
    #[arg(long, env = "REFINE_ENABLE_TASK_LOG")]
    enable_task_log: bool,

    /// Host name stored with each task log entry
    #[arg(long, env = "REFINE_HOSTNAME")]
    hostname: Option<String>,

    /// Print the N most recent task log entries as JSON lines and exit
    #[arg(long, value_name = "N")]
    show_log: Option<usize>,

    /// `[module::]task[:method]` followed by arguments passed to the task
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "TASK")]
    command: Vec<String>,
}

fn load_config(cli: &Cli) -> Result<RefineConfig> {
    let mut config = match &cli.config {
        Some(path) => RefineConfig::load(path)?,
        None => RefineConfig::load_or_default(&PathBuf::from(DEFAULT_CONFIG))?,
    };
    if let Some(db) = &cli.db {
        config.task_log.database = db.clone();
    }
    if cli.enable_task_log {
        config.task_log.enabled = true;
    }
    if let Some(hostname) = &cli.hostname {
        config.hostname = Some(hostname.clone());
    }
    Ok(config)
}

async fn show_log(store: Option<Arc<dyn TaskLogStore>>, limit: usize) -> Result<()> {
    let Some(store) = store else {
        bail!("task log is disabled; pass --enable-task-log or set task_log.enabled");
    };
    for entry in store.recent(limit).await? {
        println!("{}", serde_json::to_string(&entry)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    debug!(?config, "configuration loaded");

    let store = config
        .task_log
        .open()
        .context("failed to open task log")?
        .map(|store| Arc::new(store) as Arc<dyn TaskLogStore>);

    if let Some(limit) = cli.show_log {
        show_log(store, limit).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let registry = config.catalog().discover()?;
    let dispatcher = AppBuilder::new(registry)
        .maybe_task_log(store)
        .hostname(config.hostname())
        .program(config.program.clone())
        .build();

    let mut command = cli.command.into_iter();
    let task = command.next().unwrap_or_default();
    let request = DispatchRequest::new(task, command.collect());

    match dispatcher.run(request).await {
        Ok(DispatchOutcome::Failed { message }) => {
            // recorded in the task log; the dispatcher itself succeeded
            eprintln!("Task failed: {message}");
            Ok(ExitCode::SUCCESS)
        }
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            eprintln!("{err}");
            if let RefineError::MethodNotFound { task, methods, .. } = &err {
                eprintln!("Did you mean:");
                for hint in help::method_hints(dispatcher.program(), task, methods) {
                    eprintln!("    {hint}");
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
