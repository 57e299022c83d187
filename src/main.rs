//! Memoize - cached shell command output
//!
//! CLI entry point: replays cached output or runs and caches the command.

use clap::{CommandFactory, Parser};
use console::style;
use memoize::cli::{commands, Cli};
use memoize::config::{ConfigManager, Paths};
use memoize::error::{MemoizeError, MemoizeResult};
use memoize::pipeline::Memoizer;
use memoize::shell::CommandLine;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            // Only configuration and usage problems fail the invocation
            if e.is_fatal() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}

async fn run() -> MemoizeResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug. Stdout is
    // reserved for command output.
    let filter = match cli.verbose {
        0 => EnvFilter::new("memoize=warn"),
        1 => EnvFilter::new("memoize=info"),
        _ => EnvFilter::new("memoize=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let maintenance = cli.list_entries || cli.clear;
    let command = CommandLine::new(cli.command);
    if command.is_none() && !maintenance {
        eprintln!("{}", Cli::command().render_usage());
        return Err(MemoizeError::Usage);
    }

    let paths = Paths::resolve()?;

    let config_manager = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(&paths),
    };
    debug!("Loading config from {}", config_manager.path().display());
    let config = config_manager.load().await?;

    let memoizer = Memoizer::from_config(&config, &paths);

    if cli.list_entries {
        return commands::list(memoizer.store()).await;
    }
    if cli.clear {
        return commands::clear(memoizer.store()).await;
    }

    match command {
        Some(command) => commands::run(&memoizer, command, cli.reset).await,
        None => Err(MemoizeError::Usage),
    }
}
