pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod form;
pub mod persist;
pub mod storage;
pub mod store;
pub mod task;
pub mod ui;
pub mod view;

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command};

pub const LOG_FILE: &str = "tarefas.log";

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = Cli::parse_from(raw_args);
    let command = cli.command.clone().unwrap_or(Command::Tui);
    let interactive = matches!(command, Command::Tui);

    // The TUI owns the terminal, so its logs wait for the data directory.
    if !interactive {
        cli::init_tracing(cli.verbose, cli.quiet, None)?;
    }

    let cfg = config::Config::load(cli.config.as_deref())?;
    let data_dir = config::resolve_data_dir(&cfg, cli.data_dir.as_deref())
        .context("failed to resolve data directory")?;

    if interactive {
        let log_path = data_dir.join(LOG_FILE);
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("failed to open {}", log_path.display()))?;
        cli::init_tracing(cli.verbose, cli.quiet, Some(log_file))?;
    }

    info!(data_dir = %data_dir.display(), ?command, "starting tarefas");

    let storage = Arc::new(storage::FileStore::new(&data_dir));
    let mut store = store::TaskStore::open(storage);

    if interactive {
        ui::run_tui(app::App::new(
            store,
            cfg.default_filter,
            cfg.show_completed,
        ))?;
    } else {
        commands::dispatch(
            &mut store,
            command,
            cfg.default_filter,
            cfg.show_completed,
            Utc::now(),
            &mut std::io::stdout().lock(),
        )?;
    }

    info!("done");
    Ok(())
}
