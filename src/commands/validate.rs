//! # Validate Command Implementation
//!
//! `gitdir validate` checks a configuration file without cloning anything:
//!
//! - **Structure**: the YAML parses, urls, revisions and targets are present,
//!   and no two mappings share a target.
//! - **Auth blocks**: every `auth.type` is supported and carries the fields it
//!   needs.
//! - **Credentials** (with `--check-auth`): credential-store entries and SSH
//!   keys can actually be found on this machine.
//! - **Revisions**: anything other than a full commit hash is a warning, since
//!   branch and tag names can move between runs.
//!
//! This command never touches any target directory.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use gitdir::config::{self, Config};
use gitdir::credentials::CredentialResolver;
use gitdir::output::{emoji, OutputConfig};

/// Check a configuration file without cloning anything
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "gitdir.yaml",
        env = "GITDIR_CONFIG"
    )]
    pub config: PathBuf,

    /// Also resolve credentials and SSH keys for every repository
    #[arg(long)]
    pub check_auth: bool,

    /// Fail on warnings
    #[arg(long)]
    pub strict: bool,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Validating configuration: {}",
        emoji(&out, "🔍", "[SCAN]"),
        args.config.display()
    );

    let config = match config::from_file(&args.config) {
        Ok(config) => {
            println!(
                "{} Configuration file parsed successfully",
                emoji(&out, "✅", "[OK]")
            );
            config
        }
        Err(e) => {
            println!(
                "{} Configuration parsing failed: {}",
                emoji(&out, "❌", "[ERR]"),
                e
            );
            return Err(anyhow::anyhow!("Configuration parsing failed: {}", e));
        }
    };

    println!("\n{} Configuration Summary:", emoji(&out, "📊", "[INFO]"));
    println!("   Repositories: {}", config.repos.len());
    println!("   Directory mappings: {}", config.mapping_count());

    let resolver = args.check_auth.then(CredentialResolver::from_env);
    let findings = check(&config, resolver.as_ref());

    for warning in &findings.warnings {
        println!("{} {}", emoji(&out, "⚠️", "[WARN]"), warning);
    }
    for error in &findings.errors {
        println!("{} {}", emoji(&out, "❌", "[ERR]"), error);
    }

    if !findings.errors.is_empty() {
        anyhow::bail!(
            "Configuration validation failed with {} errors",
            findings.errors.len()
        );
    }
    if !findings.warnings.is_empty() && args.strict {
        println!(
            "{} Configuration has warnings (strict mode enabled)",
            emoji(&out, "❌", "[ERR]")
        );
        anyhow::bail!("Configuration validation failed in strict mode");
    }

    println!("\n{} Configuration is valid", emoji(&out, "✅", "[OK]"));
    Ok(())
}

#[derive(Debug, Default)]
struct Findings {
    warnings: Vec<String>,
    errors: Vec<String>,
}

fn check(config: &Config, resolver: Option<&CredentialResolver>) -> Findings {
    let mut findings = Findings::default();

    for repo in &config.repos {
        let auth = match repo.auth.to_spec() {
            Ok(auth) => auth,
            Err(e) => {
                findings.errors.push(format!("{}: {}", repo.url, e));
                continue;
            }
        };
        if let Some(resolver) = resolver {
            if let Err(e) = resolver.resolve(&auth, &repo.url) {
                findings.errors.push(format!("{}: {}", repo.url, e));
            }
        }

        for dir in &repo.directories {
            if !is_commit_hash(&dir.revision) {
                findings.warnings.push(format!(
                    "{}: revision '{}' of '{}' is not a full commit hash and may move",
                    repo.url, dir.revision, dir.source
                ));
            }
        }
    }

    findings
}

fn is_commit_hash(revision: &str) -> bool {
    matches!(revision.len(), 40 | 64) && revision.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    fn write_config(dir: &TempDir, yaml: &str) -> PathBuf {
        let path = dir.path().join("gitdir.yaml");
        fs::write(&path, yaml).unwrap();
        path
    }

    fn args(config: PathBuf, strict: bool) -> ValidateArgs {
        ValidateArgs {
            config,
            check_auth: false,
            strict,
        }
    }

    #[test]
    fn test_is_commit_hash() {
        assert!(is_commit_hash(HASH));
        assert!(!is_commit_hash("main"));
        assert!(!is_commit_hash("0123456"));
        assert!(!is_commit_hash(&"z".repeat(40)));
    }

    #[test]
    fn test_execute_valid_config() {
        let temp = TempDir::new().unwrap();
        let yaml = format!(
            "repos:\n  - url: https://github.com/example/example.git\n    directories:\n      \
             - source: deploy\n        target: out\n        revision: {}\n",
            HASH
        );
        execute(args(write_config(&temp, &yaml), true), "never").unwrap();
    }

    #[test]
    fn test_execute_branch_revision_fails_only_in_strict_mode() {
        let temp = TempDir::new().unwrap();
        let yaml = "repos:\n  - url: https://github.com/example/example.git\n    directories:\n      \
                    - source: deploy\n        target: out\n        revision: main\n";
        let path = write_config(&temp, yaml);

        execute(args(path.clone(), false), "never").unwrap();
        let err = execute(args(path, true), "never").unwrap_err();
        assert!(err.to_string().contains("strict mode"));
    }

    #[test]
    fn test_execute_unsupported_auth() {
        let temp = TempDir::new().unwrap();
        let yaml = format!(
            "repos:\n  - url: https://github.com/example/example.git\n    auth:\n      type: kerberos\n    \
             directories:\n      - source: deploy\n        target: out\n        revision: {}\n",
            HASH
        );
        let err = execute(args(write_config(&temp, &yaml), false), "never").unwrap_err();
        assert!(err.to_string().contains("1 errors"));
    }

    #[test]
    fn test_check_auth_reports_missing_credentials() {
        let temp = TempDir::new().unwrap();
        let config = config::parse(&format!(
            "repos:\n  - url: https://github.com/example/example.git\n    auth:\n      \
             type: credential-store\n    directories:\n      - source: deploy\n        \
             target: out\n        revision: {}\n",
            HASH
        ))
        .unwrap();
        let resolver = CredentialResolver::new(Some(temp.path().to_path_buf()), None);

        let findings = check(&config, Some(&resolver));
        assert_eq!(findings.errors.len(), 1);
        assert!(findings.errors[0].contains("no credentials file found"));
        assert!(check(&config, None).errors.is_empty());
    }

    #[test]
    fn test_execute_missing_file() {
        let err = execute(
            args(PathBuf::from("/nonexistent/gitdir.yaml"), false),
            "never",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Configuration parsing failed"));
    }
}
