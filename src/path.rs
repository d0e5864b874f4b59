//! Path manipulation utilities for gitdir

use crate::error::{Error, Result};
use url::Url;

/// Join two path fragments into a single absolute, slash-separated path.
///
/// Both fragments may carry leading, trailing or repeated separators. Empty
/// segments are dropped and the result always starts with exactly one `/`,
/// so two empty fragments normalize to `/`.
///
/// ```
/// use gitdir::path::full_path;
///
/// assert_eq!(full_path("/var/tmp/", "//asd//das//asd//"), "/var/tmp/asd/das/asd");
/// assert_eq!(full_path("", ""), "/");
/// ```
pub fn full_path(start: &str, end: &str) -> String {
    let joined = format!("{}/{}", start, end);
    let segments: Vec<&str> = joined.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Strip the root separator so a normalized path can be joined onto a real
/// directory with `Path::join`.
pub fn relative(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Extract the host of a git repository URL.
///
/// Accepts scheme URLs (`https://github.com/org/repo.git`,
/// `ssh://git@host/org/repo.git`) and scp-like remotes
/// (`git@gitlab.com:org/repo.git`).
pub fn domain_from_url(repo: &str) -> Result<String> {
    let invalid = || Error::InvalidRepoUrl {
        url: repo.to_string(),
    };

    if repo.contains("://") {
        let parsed = Url::parse(repo).map_err(|_| invalid())?;
        return parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .ok_or_else(invalid);
    }

    // scp-like syntax: [user@]host:path
    if let Some((authority, remote_path)) = repo.split_once(':') {
        let host = authority
            .rsplit_once('@')
            .map(|(_, host)| host)
            .unwrap_or(authority);
        if !host.is_empty() && !remote_path.is_empty() && !host.contains('/') {
            return Ok(host.to_string());
        }
    }

    Err(invalid())
}
