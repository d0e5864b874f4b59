//! Tree Materializer: the consumer half of a mapping
//!
//! The materializer owns the target directory for the duration of a mapping.
//! It first removes whatever is there and recreates it empty, then mirrors
//! each [`TreeEntry`] it receives:
//!
//! - directories are created with mode `0755`, whatever mode the source had;
//! - files are copied byte for byte from the repository filesystem and
//!   flushed to disk with `sync_all` before the next entry is taken.
//!
//! Any failure raises the `fail` token so the walker stops producing, and the
//! receiver is dropped on return, which releases a walker blocked in `send`.

use std::fs::{self, DirBuilder};
use std::io;
use std::path::{Component, Path};
use std::sync::mpsc::Receiver;

use log::debug;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::filesystem::VirtualFs;
use crate::path::{full_path, relative};
use crate::walker::TreeEntry;

const DIR_MODE: u32 = 0o755;

/// What a finished mapping produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingStats {
    pub directories: usize,
    pub files: usize,
    pub bytes: u64,
}

/// Rebuild `target` from the entries on `rx`.
///
/// `fs` is the unscoped repository filesystem and `source_root` the subtree
/// the entries were walked from; file contents are read from
/// `source_root + entry.path`.
pub fn materialize(
    target: &Path,
    fs: &dyn VirtualFs,
    source_root: &str,
    rx: Receiver<TreeEntry>,
    stop: &CancellationToken,
    fail: &CancellationToken,
) -> Result<MappingStats> {
    let result = run(target, fs, source_root, &rx, stop);
    if let Err(e) = &result {
        if !e.is_cancelled() {
            fail.cancel();
        }
    }
    // `rx` drops here, unblocking a walker that is waiting to send.
    result
}

fn run(
    target: &Path,
    fs: &dyn VirtualFs,
    source_root: &str,
    rx: &Receiver<TreeEntry>,
    stop: &CancellationToken,
) -> Result<MappingStats> {
    reset_target(target)?;

    let mut stats = MappingStats::default();
    loop {
        if stop.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let entry = match rx.recv() {
            Ok(entry) => entry,
            // The walker dropped its sender: either it finished or it failed.
            Err(_) if stop.is_cancelled() => return Err(Error::Cancelled),
            Err(_) => return Ok(stats),
        };

        let destination = target.join(relative(&entry.path));
        if entry.is_dir {
            create_dir(&destination).map_err(|e| materialize_error(&destination, e))?;
            stats.directories += 1;
        } else {
            let source = full_path(source_root, &entry.path);
            stats.bytes += copy_file(fs, &source, &destination)?;
            stats.files += 1;
        }
    }
}

/// Remove the target and recreate it empty.
fn reset_target(target: &Path) -> Result<()> {
    if is_unsafe_target(target) {
        return Err(Error::UnsafeTarget {
            path: target.display().to_string(),
        });
    }

    match fs::remove_dir_all(target) {
        Ok(()) => debug!("Removed previous contents of {}", target.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(materialize_error(target, e)),
    }
    fs::create_dir_all(target).map_err(|e| materialize_error(target, e))
}

/// Remove the target of a mapping that did not finish.
///
/// Unsafe targets are left alone; a missing target is not an error.
pub fn discard_target(target: &Path) -> Result<()> {
    if is_unsafe_target(target) {
        return Err(Error::UnsafeTarget {
            path: target.display().to_string(),
        });
    }
    match fs::remove_dir_all(target) {
        Ok(()) => {
            debug!("Removed stale target {}", target.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(materialize_error(target, e)),
    }
}

/// Targets that must never be wiped: the empty path, `.`, and filesystem roots.
fn is_unsafe_target(target: &Path) -> bool {
    let meaningful: Vec<Component> = target
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    meaningful.is_empty()
        || meaningful
            .iter()
            .all(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
}

fn create_dir(path: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(path)
}

fn copy_file(fs: &dyn VirtualFs, source: &str, destination: &Path) -> Result<u64> {
    let mut reader = fs.open(source).map_err(|e| Error::Materialize {
        path: source.to_string(),
        message: format!("unable to open source file: {}", e),
    })?;
    let mut file = fs::File::create(destination).map_err(|e| materialize_error(destination, e))?;
    let copied = io::copy(&mut reader, &mut file).map_err(|e| materialize_error(destination, e))?;
    file.sync_all()
        .map_err(|e| materialize_error(destination, e))?;
    Ok(copied)
}

fn materialize_error(path: &Path, err: io::Error) -> Error {
    Error::Materialize {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
