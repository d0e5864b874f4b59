//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! #[cfg_attr(not(feature = "integration-tests"), ignore)]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::EMPTY);
//!     fixture.command().arg("validate").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::{git_available, GitRepoFixture, TestFixture};
}

/// Common configuration YAML snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// No repositories at all.
    pub const EMPTY: &str = "repos: []\n";

    /// One public repository, one pinned directory.
    pub const SINGLE: &str = r#"
repos:
  - url: https://github.com/example/example.git
    directories:
      - source: deploy
        target: out/deploy
        revision: 0123456789abcdef0123456789abcdef01234567
"#;

    /// Pinned to a branch name, which `validate --strict` rejects.
    pub const BRANCH_REVISION: &str = r#"
repos:
  - url: https://github.com/example/example.git
    directories:
      - source: deploy
        target: out/deploy
        revision: main
"#;

    /// An auth type gitdir does not support.
    pub const UNSUPPORTED_AUTH: &str = r#"
repos:
  - url: https://github.com/example/example.git
    auth:
      type: kerberos
    directories:
      - source: deploy
        target: out/deploy
        revision: 0123456789abcdef0123456789abcdef01234567
"#;

    /// Two mappings writing the same target.
    pub const DUPLICATE_TARGET: &str = r#"
repos:
  - url: https://github.com/example/example.git
    directories:
      - source: a
        target: out
        revision: 0123456789abcdef0123456789abcdef01234567
      - source: b
        target: ./out
        revision: 0123456789abcdef0123456789abcdef01234567
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "repos: [unclosed";
}

/// Whether a usable `git` binary is on PATH.
#[allow(dead_code)]
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A temporary directory holding a `gitdir.yaml` and whatever else a test
/// writes into it.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `gitdir.yaml` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("gitdir.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("gitdir.yaml")
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A `gitdir` command running in this fixture's directory, with a clean
    /// environment for config discovery and credentials.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("gitdir");
        cmd.current_dir(self.path())
            .env_remove("GITDIR_CONFIG")
            .env_remove("RUST_LOG")
            .env("HOME", self.path())
            .env_remove("XDG_CONFIG_HOME")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A local git repository built commit by commit, for sync tests that need a
/// real clone.
#[allow(dead_code)]
pub struct GitRepoFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl GitRepoFixture {
    pub fn new() -> Self {
        let fixture = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        };
        fixture.git(&["init", "--quiet"]);
        fixture.git(&["config", "user.email", "tests@example.com"]);
        fixture.git(&["config", "user.name", "gitdir tests"]);
        fixture.git(&["config", "commit.gpgsign", "false"]);
        fixture
    }

    /// `file://` URL of the repository.
    pub fn url(&self) -> String {
        format!("file://{}", self.temp_dir.path().display())
    }

    pub fn write(&self, path: &str, content: &str) -> &Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn remove(&self, path: &str) -> &Self {
        self.git(&["rm", "-r", "--quiet", path]);
        self
    }

    /// Commit everything and return the commit hash.
    pub fn commit(&self, message: &str) -> String {
        self.git(&["add", "--all"]);
        self.git(&["commit", "--quiet", "--allow-empty", "-m", message]);
        self.git(&["rev-parse", "HEAD"])
    }

    fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.temp_dir.path())
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_config() {
        let fixture = TestFixture::new().with_config(configs::EMPTY);
        assert!(fixture.config_path().exists());
    }

    #[test]
    fn test_configs_are_valid_yaml() {
        for config in [
            configs::EMPTY,
            configs::SINGLE,
            configs::BRANCH_REVISION,
            configs::UNSUPPORTED_AUTH,
            configs::DUPLICATE_TARGET,
        ] {
            let parsed: Result<serde_yaml::Value, _> = serde_yaml::from_str(config);
            assert!(parsed.is_ok(), "config should be valid YAML: {}", config);
        }
    }
}
