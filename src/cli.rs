//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// gitdir - Extract directories from git repositories at pinned revisions
#[derive(Parser, Debug)]
#[command(name = "gitdir")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract every configured directory into its target
    Sync(commands::sync::SyncArgs),

    /// Check a configuration file without cloning anything
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Sync(args) => commands::sync::execute(args, &self.color),
            Commands::Validate(args) => commands::validate::execute(args, &self.color),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second init (e.g. from tests) keeps the first logger.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .try_init();
}
