//! Depcollect CLI - command-line interface
//!
//! Thin binary over the `depcollect` library: argument parsing, logging
//! setup, the confirmation prompt for destructive operations, and progress
//! rendering. Exit codes live here; the library reports per-dependency
//! outcomes and never terminates the process.

mod commands;
mod error;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "depcollect",
    version,
    about = "Collects and processes the dependencies declared in 'dependencies.json' manifests"
)]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory to start from (defaults to the current working directory)
    #[arg(long, global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve and materialize the dependency tree (the default action)
    Resolve {
        /// Clean the whole tree first, then resolve everything from scratch
        #[arg(long)]
        force: bool,
    },

    /// Delete every materialized dependency reachable from the root
    Clean {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let root = match cli.dir.map(Ok).unwrap_or_else(std::env::current_dir) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("error: could not determine the working directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Commands::Resolve { force: false }) {
        Commands::Resolve { force } => commands::resolve::run(&root, force),
        Commands::Clean { yes } => commands::clean::run(&root, yes),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the fmt subscriber for this invocation.
///
/// `RUST_LOG` wins when set; otherwise the `-v` count selects the level.
fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_resolve() {
        let cli = Cli::try_parse_from(["depcollect"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
        assert!(cli.dir.is_none());
    }

    #[test]
    fn test_parse_resolve_force() {
        let cli = Cli::try_parse_from(["depcollect", "resolve", "--force"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Resolve { force: true })));
    }

    #[test]
    fn test_parse_clean_yes() {
        let cli = Cli::try_parse_from(["depcollect", "clean", "-y"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Clean { yes: true })));
    }

    #[test]
    fn test_parse_verbosity_and_dir() {
        let cli =
            Cli::try_parse_from(["depcollect", "-vv", "--dir", "/project", "resolve"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.dir, Some(PathBuf::from("/project")));
    }
}
