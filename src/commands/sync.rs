//! # Sync Command Implementation
//!
//! `gitdir sync` loads the configuration, then clones each repository and
//! extracts its directories into their targets. Every mapping is attempted;
//! the command fails at the end if any of them did not finish.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use gitdir::config;
use gitdir::credentials::CredentialResolver;
use gitdir::git::GitCli;
use gitdir::orchestrator::{Orchestrator, RunReport};
use gitdir::output::{outcome_line, summary_line, OutputConfig};

/// Extract every configured directory into its target
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "gitdir.yaml",
        env = "GITDIR_CONFIG"
    )]
    pub config: PathBuf,

    /// Process repositories concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Suppress the per-mapping summary
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the `sync` command.
pub fn execute(args: SyncArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let report = run(&args)?;

    if !args.quiet {
        for outcome in &report.outcomes {
            println!("{}", outcome_line(&out, outcome));
        }
        println!("{}", summary_line(&out, &report));
    }

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} mappings failed",
            report.failed(),
            report.outcomes.len()
        );
    }
    Ok(())
}

fn run(args: &SyncArgs) -> Result<RunReport> {
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }
    let config = config::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    log::info!(
        "Loaded {} mappings from {} repositories",
        config.mapping_count(),
        config.repos.len()
    );

    let orchestrator = Orchestrator::new(Box::new(GitCli::new()), CredentialResolver::from_env())
        .with_parallel(args.parallel);
    Ok(orchestrator.run(&config))
}
