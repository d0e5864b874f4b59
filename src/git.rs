use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use log::debug;
use secrecy::ExposeSecret;
use tempfile::TempDir;

use crate::credentials::ResolvedAuth;
use crate::error::{Error, Result};
use crate::filesystem::{DiskFs, VirtualFs};
use crate::repository::{RepositoryHandle, SourceControl};

/// Answers git's credential requests from the child environment so the
/// secret never appears on a command line.
const CREDENTIAL_HELPER: &str = "credential.helper=!f() { test \"$1\" = get || exit 0; \
     echo \"username=${GITDIR_USERNAME}\"; echo \"password=${GITDIR_PASSWORD}\"; }; f";

/// Clones with the system `git` binary into a temporary directory.
///
/// This uses whatever transport git supports. Auth is passed through:
/// - SSH keys via `GIT_SSH_COMMAND`
/// - passwords and tokens via an inline credential helper
///
/// `GIT_TERMINAL_PROMPT=0` is always set so a missing credential fails the
/// clone instead of waiting for input.
#[derive(Debug, Clone)]
pub struct GitCli {
    git: OsString,
    work_root: Option<PathBuf>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            git: OsString::from("git"),
            work_root: None,
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable.
    pub fn with_binary(mut self, git: impl Into<OsString>) -> Self {
        self.git = git.into();
        self
    }

    /// Create clone directories under `root` instead of the system temp dir.
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    fn command(&self, auth: &ResolvedAuth) -> Command {
        let mut cmd = Command::new(&self.git);
        cmd.env("GIT_TERMINAL_PROMPT", "0");

        match auth {
            ResolvedAuth::None => {}
            ResolvedAuth::SshKey(key) => {
                cmd.env(
                    "GIT_SSH_COMMAND",
                    format!("ssh -i {} -o IdentitiesOnly=yes", shell_quote(key)),
                );
            }
            ResolvedAuth::Password(credential) => {
                // The empty helper clears any helpers from the user's gitconfig.
                cmd.args(["-c", "credential.helper=", "-c", CREDENTIAL_HELPER])
                    .env("GITDIR_USERNAME", &credential.username)
                    .env("GITDIR_PASSWORD", credential.secret.expose_secret());
            }
        }
        cmd
    }

    fn temp_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("gitdir-");
        match &self.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

impl SourceControl for GitCli {
    fn clone_repo(&self, url: &str, auth: &ResolvedAuth) -> Result<Box<dyn RepositoryHandle>> {
        let clone_error = |message: String, hint: Option<String>| Error::GitClone {
            url: url.to_string(),
            message,
            hint,
        };

        let dir = self
            .temp_dir()
            .map_err(|e| clone_error(format!("cannot create clone directory: {}", e), None))?;
        let worktree = dir.path().join("worktree");

        debug!("Cloning {} into {}", url, worktree.display());
        let output = self
            .command(auth)
            .args(["clone", "--no-checkout", "--quiet", "--", url])
            .arg(&worktree)
            .output()
            .map_err(|e| {
                clone_error(
                    e.to_string(),
                    Some("Make sure git is installed and on PATH".to_string()),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

            // Provide helpful error message for common auth failures
            let hint = if stderr.contains("Authentication failed")
                || stderr.contains("Permission denied")
                || stderr.contains("Could not read from remote repository")
                || stderr.contains("terminal prompts disabled")
            {
                Some(
                    "Check the auth block of this repository: SSH key path, \
                     credential-store entry or explicit credentials"
                        .to_string(),
                )
            } else {
                None
            };
            return Err(clone_error(stderr, hint));
        }

        Ok(Box::new(GitCheckout {
            url: url.to_string(),
            git: self.git.clone(),
            fs: Arc::new(DiskFs::new(&worktree)),
            worktree,
            _dir: dir,
        }))
    }
}

/// A clone on disk. The directory is removed when the handle drops.
struct GitCheckout {
    url: String,
    git: OsString,
    worktree: PathBuf,
    fs: Arc<DiskFs>,
    _dir: TempDir,
}

impl RepositoryHandle for GitCheckout {
    fn checkout(&mut self, revision: &str) -> Result<()> {
        let output = Command::new(&self.git)
            .arg("-C")
            .arg(&self.worktree)
            .args(["checkout", "--quiet", "--force", "--detach", revision, "--"])
            .output()
            .map_err(|e| Error::GitCheckout {
                url: self.url.clone(),
                revision: revision.to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::GitCheckout {
                url: self.url.clone(),
                revision: revision.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn filesystem(&self) -> Arc<dyn VirtualFs> {
        self.fs.clone()
    }
}

/// Quote a path for the POSIX shell git uses to run `GIT_SSH_COMMAND`.
fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}
