//! # gitdir
//!
//! Extracts selected directories of remote Git repositories, each pinned to a
//! revision, into local target directories. It is meant for vendoring a few
//! subtrees (manifests, schemas, shared configuration) without keeping a
//! submodule or a full clone around.
//!
//! ## Quick Example
//!
//! ```
//! use gitdir::filesystem::MemoryFs;
//! use gitdir::orchestrator::extract_mapping;
//!
//! let mut repo = MemoryFs::new();
//! repo.add_file_string("deploy/a/file1.txt", "hello").unwrap();
//! repo.add_dir("deploy/b").unwrap();
//! let repo = repo.into_shared();
//!
//! let out = tempfile::tempdir().unwrap();
//! let target = out.path().join("T");
//! let stats = extract_mapping(&repo, "deploy", &target).unwrap();
//!
//! assert_eq!(stats.files, 1);
//! assert_eq!(std::fs::read_to_string(target.join("a/file1.txt")).unwrap(), "hello");
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: the `gitdir.yaml` schema. Each repository
//!   lists an auth block and a set of `source`/`target`/`revision` mappings.
//! - **Credentials (`credentials`)**: turns an auth block into something a
//!   clone can use, reading git's plain-text credential store when asked.
//! - **Virtual filesystem (`filesystem`)**: the read-only view of a checked-out
//!   tree, with in-memory and on-disk implementations.
//! - **Source control (`repository`, `git`)**: clone and checkout behind a
//!   trait, implemented with the system `git` binary.
//! - **Pipeline (`walker`, `materializer`, `orchestrator`)**: a producer that
//!   enumerates the source subtree and a consumer that rebuilds it on disk,
//!   connected by a rendezvous channel and stopped together on failure.
//!
//! ## Execution Flow
//!
//! For every repository in the configuration:
//!
//! 1.  **Auth**: resolve the auth block (none, SSH key, credential store, or
//!     explicit username and password).
//! 2.  **Clone**: clone the repository once.
//! 3.  **Per mapping**: check out the revision, wipe the target, then walk and
//!     materialize the source directory into it.
//!
//! Every mapping ends with an outcome in the run report. A failure in one
//! repository never stops the others.

pub mod cancel;
pub mod config;
pub mod credentials;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod materializer;
pub mod orchestrator;
pub mod output;
pub mod path;
pub mod repository;
pub mod walker;

#[cfg(test)]
mod path_proptest;
