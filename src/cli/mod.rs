use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigLoader, PathOverrides};
use crate::dates;
use crate::storage;

pub mod commands;

use self::commands::AddArgs;

#[derive(Parser, Debug)]
#[command(
    name = "taskcells",
    version,
    about = "Keyboard-first terminal task list"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the directory holding the cookie jar
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Keep tasks in memory only for this run
    #[arg(long)]
    pub no_persist: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive task list (default)
    Tui,
    /// Add a task from the command line
    Add(AddArgs),
    /// Print every task with its completion marker and creation date
    List,
}

/// Where log lines end up for this run.
#[derive(Debug)]
enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
}

pub fn run() -> Result<()> {
    // must happen before any other thread exists
    dates::init_local_offset();

    let cli = Cli::parse();
    let overrides = PathOverrides {
        config: cli.config.clone(),
        data_dir: cli.data_dir.clone(),
    };

    let loader = ConfigLoader::discover(&overrides)?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();

    let command = cli.command.unwrap_or(Commands::Tui);
    let log_file = paths.log_dir.join("taskcells.log");
    let target = match command {
        Commands::Tui => LogTarget::File(&log_file),
        Commands::Add(_) | Commands::List => LogTarget::Stderr,
    };
    init_tracing(&cli.log_level, target)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let mut config = loader.load_or_init()?;
    if cli.no_persist {
        config.storage.enabled = false;
    }
    let opened = storage::open(&config.storage);

    let config = Arc::new(config);
    match command {
        Commands::Tui => commands::run_tui(config, opened),
        Commands::Add(args) => commands::add_task(&config, opened, args),
        Commands::List => commands::list_tasks(&config, opened),
    }
}

fn init_tracing(level: &str, target: LogTarget<'_>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match target {
            LogTarget::Stderr => fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init(),
            LogTarget::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
        }
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::Parser;

    use super::*;

    #[test]
    fn parses_add_with_global_flags() {
        let cli = Cli::try_parse_from([
            "taskcells",
            "--no-persist",
            "--log-level",
            "debug",
            "add",
            "water",
            "the",
            "plants",
        ])
        .expect("parse");
        assert!(cli.no_persist);
        assert_eq!(cli.log_level, "debug");
        assert_matches!(cli.command, Some(Commands::Add(args)) if args.text == ["water", "the", "plants"]);
    }

    #[test]
    fn defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["taskcells"]).expect("parse");
        assert!(cli.command.is_none());
        assert!(!cli.no_persist);
        assert_eq!(cli.log_level, "info");
    }
}
