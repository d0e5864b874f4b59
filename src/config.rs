//! # Configuration Schema and Parsing
//!
//! This module defines the data structures that represent a `gitdir.yaml`
//! configuration file and the logic for parsing it:
//!
//! ```yaml
//! repos:
//!   - url: https://github.com/example/example.git
//!     auth:
//!       type: credential-store
//!     directories:
//!       - source: deploy/manifests
//!         target: ./out/manifests
//!         revision: 0123456789abcdef0123456789abcdef01234567
//! ```
//!
//! ## Key Components
//!
//! - **`Config`**: the whole document, a list of `Repo`s.
//! - **`AuthConfig`**: the auth block exactly as written. It is turned into the
//!   closed [`AuthSpec`] type with [`AuthConfig::to_spec`]; an unknown `type` is
//!   only an error for the repository that carries it, so that conversion
//!   happens per repository rather than while parsing.
//! - **`ExtractionJob`**: one directory mapping with everything needed to run
//!   it, produced by [`Repo::jobs`].
//!
//! `parse` also runs structural validation: urls, revisions and targets must be
//! non-empty and no two mappings may share a target, since every run wipes the
//! target before rebuilding it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The whole configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub repos: Vec<Repo>,
}

/// One repository and the directories to extract from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repo {
    /// Clone URL (https, ssh or scp-like)
    pub url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub directories: Vec<Directory>,
}

/// The auth block as written in the configuration file
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// `none`, `ssh` (or `ssh-key`), `credential-store` or `explicit`
    #[serde(rename = "type", default = "default_auth_type")]
    pub kind: String,
    /// Method parameters: `key` for ssh, `username`/`password` for explicit
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
}

fn default_auth_type() -> String {
    "none".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            kind: default_auth_type(),
            credentials: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("kind", &self.kind)
            .field("credentials", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// One directory mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directory {
    /// Directory inside the repository; empty or `/` means the whole tree
    #[serde(default)]
    pub source: String,
    /// Directory on local disk, replaced on every run
    pub target: String,
    /// Revision to check out before extracting
    pub revision: String,
}

/// Authentication method for one repository
#[derive(Clone, PartialEq, Eq)]
pub enum AuthSpec {
    None,
    SshKey { key_path: PathBuf },
    CredentialStore,
    Explicit { username: String, password: String },
}

impl AuthSpec {
    /// Short name used in logs and `validate` output.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthSpec::None => "none",
            AuthSpec::SshKey { .. } => "ssh-key",
            AuthSpec::CredentialStore => "credential-store",
            AuthSpec::Explicit { .. } => "explicit",
        }
    }
}

impl fmt::Debug for AuthSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthSpec::None => f.write_str("None"),
            AuthSpec::SshKey { key_path } => {
                f.debug_struct("SshKey").field("key_path", key_path).finish()
            }
            AuthSpec::CredentialStore => f.write_str("CredentialStore"),
            AuthSpec::Explicit { username, .. } => f
                .debug_struct("Explicit")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

impl AuthConfig {
    /// Convert the block into an [`AuthSpec`].
    pub fn to_spec(&self) -> Result<AuthSpec> {
        match self.kind.as_str() {
            "none" | "" => Ok(AuthSpec::None),
            "ssh" | "ssh-key" => {
                let key = self.required("key")?;
                Ok(AuthSpec::SshKey {
                    key_path: expand_home(key),
                })
            }
            "credential-store" => Ok(AuthSpec::CredentialStore),
            "explicit" => Ok(AuthSpec::Explicit {
                username: self.required("username")?.to_string(),
                password: self.required("password")?.to_string(),
            }),
            other => Err(Error::UnsupportedAuth {
                method: other.to_string(),
            }),
        }
    }

    fn required(&self, name: &str) -> Result<&str> {
        self.credentials
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::ConfigParse {
                message: format!("auth type '{}' requires credentials.{}", self.kind, name),
                hint: Some(format!(
                    "Add '{}:' under 'credentials:' in the auth block",
                    name
                )),
            })
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// One directory mapping, ready to be extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    pub repository_url: String,
    pub revision: String,
    pub source_path: String,
    pub target_path: PathBuf,
    pub auth: AuthSpec,
}

impl Repo {
    /// Build one job per configured directory.
    ///
    /// Fails only when the auth block cannot be converted.
    pub fn jobs(&self) -> Result<Vec<ExtractionJob>> {
        let auth = self.auth.to_spec()?;
        Ok(self
            .directories
            .iter()
            .map(|dir| ExtractionJob {
                repository_url: self.url.clone(),
                revision: dir.revision.clone(),
                source_path: dir.source.clone(),
                target_path: PathBuf::from(&dir.target),
                auth: auth.clone(),
            })
            .collect())
    }
}

impl Config {
    /// Total number of directory mappings
    pub fn mapping_count(&self) -> usize {
        self.repos.iter().map(|r| r.directories.len()).sum()
    }

    /// Check the structural rules that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let mut targets: Vec<(PathBuf, &str)> = Vec::new();

        for (index, repo) in self.repos.iter().enumerate() {
            if repo.url.trim().is_empty() {
                return Err(Error::ConfigParse {
                    message: format!("repos[{}] has an empty url", index),
                    hint: Some("Add 'url:' to the repo block".to_string()),
                });
            }

            for dir in &repo.directories {
                if dir.revision.trim().is_empty() {
                    return Err(Error::ConfigParse {
                        message: format!(
                            "directory '{}' of {} has an empty revision",
                            dir.source, repo.url
                        ),
                        hint: Some("Pin every directory to a commit hash".to_string()),
                    });
                }
                if dir.target.trim().is_empty() {
                    return Err(Error::ConfigParse {
                        message: format!(
                            "directory '{}' of {} has an empty target",
                            dir.source, repo.url
                        ),
                        hint: None,
                    });
                }
                let normalized = normalize_target(&dir.target);
                for (seen, seen_target) in &targets {
                    if *seen == normalized {
                        return Err(Error::ConfigParse {
                            message: format!("duplicate target {}", dir.target),
                            hint: Some(
                                "Give every directory mapping its own target; each run replaces it"
                                    .to_string(),
                            ),
                        });
                    }
                    if seen.starts_with(&normalized) || normalized.starts_with(seen) {
                        return Err(Error::ConfigParse {
                            message: format!(
                                "targets {} and {} are nested",
                                seen_target, dir.target
                            ),
                            hint: Some(
                                "Each run wipes a target; keep targets side by side, not inside one another"
                                    .to_string(),
                            ),
                        });
                    }
                }
                targets.push((normalized, dir.target.as_str()));
            }
        }

        Ok(())
    }
}

/// Lexical form used to detect two mappings writing the same target.
fn normalize_target(target: &str) -> PathBuf {
    Path::new(target)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Parse and validate a YAML configuration document.
pub fn parse(yaml_content: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(yaml_content)?;
    config.validate()?;
    Ok(config)
}

/// Load a configuration file from disk.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}
