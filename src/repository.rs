//! # Source Control Abstraction
//!
//! The extraction pipeline does not talk to git directly. It consumes two
//! traits:
//!
//! - **`SourceControl`**: clones a repository given its URL and resolved auth,
//!   returning a `RepositoryHandle`.
//! - **`RepositoryHandle`**: checks out a revision and exposes the worktree as
//!   a read-only [`VirtualFs`].
//!
//! This keeps the orchestrator testable: the default implementation,
//! [`crate::git::GitCli`], drives the system `git` binary, while tests use
//! [`MemorySourceControl`], which serves prepared in-memory trees per
//! revision without any network or disk access.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::credentials::ResolvedAuth;
use crate::error::{Error, Result};
use crate::filesystem::{MemoryFs, VirtualFs};

/// A cloned repository whose worktree can be moved between revisions.
pub trait RepositoryHandle: Send {
    /// Check out `revision`, replacing the worktree contents.
    fn checkout(&mut self, revision: &str) -> Result<()>;

    /// The worktree at the current revision.
    fn filesystem(&self) -> Arc<dyn VirtualFs>;
}

/// Trait for clone operations - allows mocking in tests
pub trait SourceControl: Send + Sync {
    fn clone_repo(&self, url: &str, auth: &ResolvedAuth) -> Result<Box<dyn RepositoryHandle>>;
}

/// In-memory repositories keyed by URL, each a set of revisions.
///
/// Every clone is recorded so tests can assert how often a repository was
/// fetched and with which kind of auth.
#[derive(Default)]
pub struct MemorySourceControl {
    repos: HashMap<String, HashMap<String, Arc<dyn VirtualFs>>>,
    clones: Mutex<Vec<(String, &'static str)>>,
}

impl MemorySourceControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the tree of `url` at `revision`.
    pub fn with_revision(mut self, url: &str, revision: &str, fs: MemoryFs) -> Self {
        self.repos
            .entry(url.to_string())
            .or_default()
            .insert(revision.to_string(), fs.into_shared());
        self
    }

    /// Register an arbitrary filesystem, e.g. one that injects failures.
    pub fn with_filesystem(mut self, url: &str, revision: &str, fs: Arc<dyn VirtualFs>) -> Self {
        self.repos
            .entry(url.to_string())
            .or_default()
            .insert(revision.to_string(), fs);
        self
    }

    /// (url, auth kind) of every clone so far
    pub fn clones(&self) -> Vec<(String, &'static str)> {
        match self.clones.lock() {
            Ok(clones) => clones.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SourceControl for MemorySourceControl {
    fn clone_repo(&self, url: &str, auth: &ResolvedAuth) -> Result<Box<dyn RepositoryHandle>> {
        let kind = match auth {
            ResolvedAuth::None => "none",
            ResolvedAuth::SshKey(_) => "ssh-key",
            ResolvedAuth::Password(_) => "password",
        };
        match self.clones.lock() {
            Ok(mut clones) => clones.push((url.to_string(), kind)),
            Err(poisoned) => poisoned.into_inner().push((url.to_string(), kind)),
        }

        let revisions = self.repos.get(url).ok_or_else(|| Error::GitClone {
            url: url.to_string(),
            message: "repository not found".to_string(),
            hint: None,
        })?;

        Ok(Box::new(MemoryRepository {
            url: url.to_string(),
            revisions: revisions.clone(),
            current: Arc::new(MemoryFs::new()),
        }))
    }
}

struct MemoryRepository {
    url: String,
    revisions: HashMap<String, Arc<dyn VirtualFs>>,
    current: Arc<dyn VirtualFs>,
}

impl RepositoryHandle for MemoryRepository {
    fn checkout(&mut self, revision: &str) -> Result<()> {
        let fs = self
            .revisions
            .get(revision)
            .ok_or_else(|| Error::GitCheckout {
                url: self.url.clone(),
                revision: revision.to_string(),
                message: "reference is not a tree".to_string(),
            })?;
        self.current = Arc::clone(fs);
        Ok(())
    }

    fn filesystem(&self) -> Arc<dyn VirtualFs> {
        Arc::clone(&self.current)
    }
}
