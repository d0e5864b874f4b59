//! # Output Configuration
//!
//! Controls how the CLI prints the run summary. Colors and emoji follow the
//! `--color` flag and the usual environment conventions:
//! - `--color=never|always|auto`
//! - `NO_COLOR` disables decoration when set (https://no-color.org/)
//! - `CLICOLOR=0` disables, `CLICOLOR_FORCE=1` forces
//! - `TERM=dumb` disables
//!
//! Logging goes to stderr through `log`; this module only formats the
//! summary that `sync` prints to stdout.

use std::env;

use crate::orchestrator::{MappingOutcome, MappingStatus, RunReport};
use crate::path::full_path;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Build from the value of `--color`: "always", "never" or "auto".
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // Presence alone disables, even when empty
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        // TTY and terminal capability detection
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// The emoji when decoration is on, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// One line per mapping, in report order.
pub fn outcome_line(config: &OutputConfig, outcome: &MappingOutcome) -> String {
    let mapping = format!(
        "{}{} @ {} -> {}",
        outcome.url,
        full_path(&outcome.source, ""),
        outcome.revision,
        outcome.target.display()
    );
    match &outcome.status {
        MappingStatus::Done(stats) => format!(
            "{} {} ({} files, {} directories, {} bytes)",
            emoji(config, "✅", "[OK]"),
            mapping,
            stats.files,
            stats.directories,
            stats.bytes
        ),
        MappingStatus::Aborted(reason) => format!(
            "{} {}\n     {}",
            emoji(config, "❌", "[ERR]"),
            mapping,
            reason
        ),
        MappingStatus::Skipped(reason) => format!(
            "{} {}\n     {}",
            emoji(config, "⏭️", "[SKIP]"),
            mapping,
            reason
        ),
    }
}

/// Closing line of a run.
pub fn summary_line(config: &OutputConfig, report: &RunReport) -> String {
    if report.is_success() {
        format!(
            "{} {} of {} mappings extracted",
            emoji(config, "✅", "[OK]"),
            report.succeeded(),
            report.outcomes.len()
        )
    } else {
        format!(
            "{} {} of {} mappings failed",
            emoji(config, "❌", "[ERR]"),
            report.failed(),
            report.outcomes.len()
        )
    }
}
