//! # Extraction Orchestrator
//!
//! Runs every configured mapping exactly once and reports an outcome for each.
//!
//! ## One mapping
//!
//! [`extract_mapping`] scopes the repository filesystem to the mapping's
//! source directory and then runs the two halves concurrently:
//!
//! - the walker on a scoped thread, producing [`TreeEntry`] values,
//! - the materializer on the calling thread, consuming them,
//!
//! connected by a rendezvous channel (`sync_channel(0)`), so the walker is
//! never more than one entry ahead of the disk. Each side owns the token that
//! stops the other: a materializer failure stops the walker, a walker failure
//! stops the materializer. Both are joined before the function returns.
//!
//! ## One repository
//!
//! [`Orchestrator::extract_repository`] resolves auth and clones once, then
//! checks out and extracts each mapping in order. A failing clone aborts
//! every mapping of the repository. A failing checkout or missing source
//! directory aborts that mapping and skips the rest of the repository.
//! Traversal and materialization failures abort only their own mapping.
//!
//! Any mapping that does not finish has its target removed, so a failed run
//! never leaves an older tree behind that looks complete.
//!
//! ## The whole run
//!
//! [`Orchestrator::run`] walks the repositories of a [`Config`] in order, or
//! in parallel on the rayon pool when enabled. Nothing in one repository can
//! stop another.
//!
//! [`TreeEntry`]: crate::walker::TreeEntry

use std::path::{Path, PathBuf};
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use std::thread;

use log::{debug, error, info, warn};
use rayon::prelude::*;

use crate::cancel::CancellationToken;
use crate::config::{Config, ExtractionJob, Repo};
use crate::credentials::CredentialResolver;
use crate::error::{Error, Result};
use crate::filesystem::{chroot, VirtualFs};
use crate::materializer::{discard_target, materialize, MappingStats};
use crate::path::full_path;
use crate::repository::{RepositoryHandle, SourceControl};
use crate::walker::walk;

/// Final state of one mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingStatus {
    Done(MappingStats),
    /// The mapping was attempted and failed
    Aborted(String),
    /// The mapping was not attempted because an earlier step of its
    /// repository failed
    Skipped(String),
}

/// What happened to one mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingOutcome {
    pub url: String,
    pub revision: String,
    pub source: String,
    pub target: PathBuf,
    pub status: MappingStatus,
}

impl MappingOutcome {
    fn new(job: &ExtractionJob, status: MappingStatus) -> Self {
        Self {
            url: job.repository_url.clone(),
            revision: job.revision.clone(),
            source: job.source_path.clone(),
            target: job.target_path.clone(),
            status,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, MappingStatus::Done(_))
    }
}

/// Outcomes of a run, in configuration order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<MappingOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_done()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Extract `source` of `fs` into `target`.
///
/// `target` is wiped and rebuilt. On failure the returned error is the one
/// that caused the abort, never the `Cancelled` reported by the other side.
pub fn extract_mapping(
    fs: &Arc<dyn VirtualFs>,
    source: &str,
    target: &Path,
) -> Result<MappingStats> {
    let source_root = full_path(source, "");
    let scoped = chroot(fs, &source_root).map_err(|e| Error::SourcePath {
        path: source_root.clone(),
        message: e.to_string(),
    })?;

    let (tx, rx) = sync_channel(0);
    // Raised by the materializer, observed by the walker.
    let walk_stop = CancellationToken::new();
    // Raised by the walker, observed by the materializer.
    let materialize_stop = CancellationToken::new();

    thread::scope(|s| {
        let (scoped, walk_stop, materialize_stop) = (&scoped, &walk_stop, &materialize_stop);
        // `tx` moves into the walker so the channel closes when it returns.
        let walker = s.spawn(move || walk(scoped, "/", &tx, walk_stop, materialize_stop));

        let materialized = materialize(
            target,
            fs.as_ref(),
            &source_root,
            rx,
            materialize_stop,
            walk_stop,
        );
        let walked = walker.join().unwrap_or_else(|_| {
            Err(Error::Traversal {
                path: source_root.clone(),
                message: "walker thread panicked".to_string(),
            })
        });
        if let Ok(count) = &walked {
            debug!("Walked {} entries under {}", count, source_root);
        }

        match (materialized, walked) {
            (Ok(stats), Ok(_)) => Ok(stats),
            (Err(e), _) if !e.is_cancelled() => Err(e),
            (_, Err(e)) if !e.is_cancelled() => Err(e),
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    })
}

/// Drives clone, checkout and extraction for a whole configuration.
pub struct Orchestrator {
    source_control: Box<dyn SourceControl>,
    resolver: CredentialResolver,
    parallel: bool,
}

impl Orchestrator {
    pub fn new(source_control: Box<dyn SourceControl>, resolver: CredentialResolver) -> Self {
        Self {
            source_control,
            resolver,
            parallel: false,
        }
    }

    /// Process repositories concurrently. Mappings of one repository still
    /// run one after another since they share a checkout.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Attempt every mapping in `config` once.
    pub fn run(&self, config: &Config) -> RunReport {
        let per_repo: Vec<Vec<MappingOutcome>> = if self.parallel {
            config
                .repos
                .par_iter()
                .map(|repo| self.run_repo(repo))
                .collect()
        } else {
            config.repos.iter().map(|repo| self.run_repo(repo)).collect()
        };

        RunReport {
            outcomes: per_repo.into_iter().flatten().collect(),
        }
    }

    fn run_repo(&self, repo: &Repo) -> Vec<MappingOutcome> {
        match repo.jobs() {
            Ok(jobs) => self.extract_repository(&jobs),
            Err(e) => {
                error!("Invalid auth configuration for {}: {}", repo.url, e);
                repo.directories
                    .iter()
                    .map(|dir| {
                        discard_stale_target(Path::new(&dir.target));
                        MappingOutcome {
                            url: repo.url.clone(),
                            revision: dir.revision.clone(),
                            source: dir.source.clone(),
                            target: PathBuf::from(&dir.target),
                            status: MappingStatus::Aborted(e.to_string()),
                        }
                    })
                    .collect()
            }
        }
    }

    /// Clone once and extract `jobs`, which must all name the same repository.
    pub fn extract_repository(&self, jobs: &[ExtractionJob]) -> Vec<MappingOutcome> {
        let Some(first) = jobs.first() else {
            return Vec::new();
        };
        let url = first.repository_url.as_str();

        info!("Cloning repo {}", url);
        let cloned = self
            .resolver
            .resolve(&first.auth, url)
            .and_then(|auth| self.source_control.clone_repo(url, &auth));
        let mut repo = match cloned {
            Ok(repo) => repo,
            Err(e) => {
                error!("Error with cloning the git repo {}: {}", url, e);
                return jobs
                    .iter()
                    .map(|job| {
                        discard_stale_target(&job.target_path);
                        MappingOutcome::new(job, MappingStatus::Aborted(e.to_string()))
                    })
                    .collect();
            }
        };
        info!("Cloned repo {}", url);

        let mut outcomes = Vec::with_capacity(jobs.len());
        let mut skip_reason: Option<String> = None;

        for job in jobs {
            if let Some(reason) = &skip_reason {
                warn!(
                    "Skipping {} at {} from {}: {}",
                    job.source_path, job.revision, url, reason
                );
                discard_stale_target(&job.target_path);
                outcomes.push(MappingOutcome::new(
                    job,
                    MappingStatus::Skipped(reason.clone()),
                ));
                continue;
            }

            let status = match extract_job(repo.as_mut(), job) {
                Ok(stats) => {
                    info!(
                        "Copied {} files and {} directories from {} into {}",
                        stats.files,
                        stats.directories,
                        full_path(&job.source_path, ""),
                        job.target_path.display()
                    );
                    MappingStatus::Done(stats)
                }
                Err(e) => {
                    error!(
                        "Error copying {} at {} from {} into {}: {}",
                        full_path(&job.source_path, ""),
                        job.revision,
                        url,
                        job.target_path.display(),
                        e
                    );
                    if matches!(e, Error::GitCheckout { .. } | Error::SourcePath { .. }) {
                        skip_reason = Some(format!("an earlier mapping failed: {}", e));
                    }
                    discard_stale_target(&job.target_path);
                    MappingStatus::Aborted(e.to_string())
                }
            };
            outcomes.push(MappingOutcome::new(job, status));
        }

        outcomes
    }
}

fn extract_job(repo: &mut dyn RepositoryHandle, job: &ExtractionJob) -> Result<MappingStats> {
    repo.checkout(&job.revision)?;
    info!(
        "Copying files from {} at {} in {}",
        full_path(&job.source_path, ""),
        job.revision,
        job.repository_url
    );
    extract_mapping(&repo.filesystem(), &job.source_path, &job.target_path)
}

fn discard_stale_target(target: &Path) {
    if let Err(e) = discard_target(target) {
        warn!("Unable to remove stale target {}: {}", target.display(), e);
    }
}
