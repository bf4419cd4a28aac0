use std::fs::File;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::view::FilterMode;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tarefas",
    version,
    about = "To-do list with priorities, deadlines and postponement"
)]
pub struct Cli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Directory holding tasks.json
    #[arg(long, env = "TAREFAS_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to <config dir>/tarefas/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Open the interactive task list (default)
    Tui,
    /// Add a new task
    Add(TaskFields),
    /// Change title, description, priority or deadline of a task
    Edit {
        key: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Print tasks
    List {
        #[arg(short, long)]
        filter: Option<FilterMode>,
        /// Include completed tasks
        #[arg(short, long)]
        all: bool,
    },
    /// Mark a task completed, or reopen it if it already is
    Toggle { key: String },
    /// Push the deadline back by one day
    Postpone { key: String },
    /// Remove a task
    Delete { key: String },
    /// Print pending, postponed and total counts
    Stats,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TaskFields {
    #[arg(short, long)]
    pub title: Option<String>,
    #[arg(short = 'D', long)]
    pub description: Option<String>,
    /// Alta, Média or Baixa
    #[arg(short, long)]
    pub priority: Option<String>,
    /// Deadline day, YYYY-MM-DD or DD/MM/YYYY
    #[arg(short, long)]
    pub date: Option<String>,
    /// Deadline time, HH:MM
    #[arg(long)]
    pub time: Option<String>,
}

/// Installs the global subscriber. `RUST_LOG` wins over `-v`/`-q`. With a
/// log file everything goes there, otherwise to stderr.
pub fn init_tracing(verbose: u8, quiet: u8, log_file: Option<File>) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true);

    let init_result = match log_file {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => builder
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
