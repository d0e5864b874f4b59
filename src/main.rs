//! # gitdir CLI
//!
//! Binary entry point for the `gitdir` command-line tool.
//!
//! It parses arguments with `clap`, sets up logging, and dispatches to the
//! subcommand. Errors bubble up as `anyhow::Error`, which prints the chain and
//! exits non-zero. All extraction logic lives in the library crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
