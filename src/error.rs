//! # Error Handling
//!
//! This module defines the centralized error type for `gitdir`. It uses the
//! `thiserror` library to build a single `Error` enum covering every failure
//! mode of an extraction run, grouped the same way failures are scoped:
//!
//! - Configuration errors (bad YAML, unsupported auth method) are fatal to the
//!   jobs of one repository.
//! - Credential-resolution errors (no credentials file, no matching line,
//!   unreadable SSH key) are fatal to one repository's auth setup.
//! - Clone errors are fatal to one repository.
//! - Checkout and source-path errors abort one mapping and skip the rest of
//!   its repository.
//! - Traversal and materialization errors abort a single mapping.
//!
//! `Cancelled` is reported by the side of a mapping that stopped because its
//! peer failed; the peer's error is the one surfaced to the user.
//!
//! The `Result` type alias is used throughout the library.

use thiserror::Error;

/// Main error type for gitdir operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration document could not be parsed or failed validation.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The auth block names a method gitdir does not know.
    #[error("unsupported authentication method: {method}")]
    UnsupportedAuth { method: String },

    /// None of the credential-store locations exist.
    #[error("no credentials file found (searched: {searched})")]
    CredentialsFileNotFound { searched: String },

    /// The credential store has no entry for the repository's domain.
    #[error("authentication method not found for {domain}")]
    AuthNotFound { domain: String },

    /// The configured SSH private key cannot be used.
    #[error("SSH key error for {path}: {message}")]
    SshKey { path: String, message: String },

    /// The repository URL has no recognisable host.
    #[error("git repo url is invalid: {url}")]
    InvalidRepoUrl { url: String },

    /// An error occurred while cloning a Git repository.
    #[error("Git clone error for {url}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// Checking out the requested revision failed.
    #[error("Git checkout error for {url}@{revision}: {message}")]
    GitCheckout {
        url: String,
        revision: String,
        message: String,
    },

    /// The source directory does not exist at the checked-out revision.
    #[error("Source path error for {path}: {message}")]
    SourcePath { path: String, message: String },

    /// Listing or descending into a source directory failed.
    #[error("Traversal error at {path}: {message}")]
    Traversal { path: String, message: String },

    /// Writing the target tree failed.
    #[error("Materialization error at {path}: {message}")]
    Materialize { path: String, message: String },

    /// The target would wipe something that must never be wiped.
    #[error("Refusing to replace unsafe target directory: {path}")]
    UnsafeTarget { path: String },

    /// An in-memory filesystem could not be built as requested.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// The operation stopped because the other side of the mapping failed.
    #[error("Operation cancelled")]
    Cancelled,

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Whether this error only records that the peer side failed first.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
