//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Memoize - cache the output of shell commands
///
/// Runs a command once and saves its stdout under ~/.memoize/history,
/// keyed by the command text and the current directory. Later runs of the
/// same command in the same directory print the saved output instead.
#[derive(Parser, Debug)]
#[command(name = "memoize")]
#[command(author, version, about, long_about = None)]
#[command(override_usage = "memoize [OPTIONS] <COMMAND>...\n       memoize --reset <COMMAND>...")]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(long, env = "MEMOIZE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Discard the cached output and run the command again
    #[arg(long)]
    pub reset: bool,

    /// List cached entries instead of running a command
    #[arg(long, conflicts_with_all = ["reset", "clear", "command"])]
    pub list_entries: bool,

    /// Remove every cached entry instead of running a command
    #[arg(long, conflicts_with_all = ["reset", "command"])]
    pub clear: bool,

    /// Command and arguments, run through the shell
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}
