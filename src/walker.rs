//! Tree Walker: the producer half of a mapping
//!
//! The walker enumerates a virtual source tree depth-first and sends one
//! [`TreeEntry`] per file or directory onto a rendezvous channel. A directory
//! is always sent before anything inside it, so the consumer can create it
//! before it has to write children.
//!
//! Descending into a directory scopes the filesystem handle to it with
//! [`chroot`], so every level lists its own `/`.
//!
//! The channel is closed by dropping the sender once the top-level call
//! returns. A listing failure is reported by raising the `fail` token in
//! addition to the returned error, so a consumer blocked on the channel can
//! tell a failed walk from a finished one.

use std::sync::mpsc::SyncSender;
use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::filesystem::{chroot, VirtualFs};
use crate::path::full_path;

/// One traversal record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Absolute path rooted at the source subtree, e.g. `/a/file1.txt`
    pub path: String,
    pub is_dir: bool,
    /// Mode captured from the source; directories ignore it when created
    pub mode: u32,
}

/// Walk `fs` and send every entry to `tx`, returning how many were sent.
///
/// `parent` is the logical path of the root of `fs`, normally `/`.
/// The walk stops with `Error::Cancelled` as soon as `stop` is raised or the
/// receiver goes away, and with `Error::Traversal` (after raising `fail`) if
/// a directory cannot be listed or entered.
pub fn walk(
    fs: &Arc<dyn VirtualFs>,
    parent: &str,
    tx: &SyncSender<TreeEntry>,
    stop: &CancellationToken,
    fail: &CancellationToken,
) -> Result<usize> {
    let mut sent = 0;
    walk_dir(fs, &full_path(parent, ""), tx, stop, fail, &mut sent)?;
    Ok(sent)
}

fn walk_dir(
    fs: &Arc<dyn VirtualFs>,
    parent: &str,
    tx: &SyncSender<TreeEntry>,
    stop: &CancellationToken,
    fail: &CancellationToken,
    sent: &mut usize,
) -> Result<()> {
    if stop.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let entries = fs
        .read_dir("/")
        .map_err(|e| traversal_error(fail, parent, e))?;

    for entry in entries {
        if stop.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let path = full_path(parent, &entry.name);
        let record = TreeEntry {
            path: path.clone(),
            is_dir: entry.is_dir,
            mode: entry.mode,
        };
        // Blocks until the materializer takes the entry.
        tx.send(record).map_err(|_| Error::Cancelled)?;
        *sent += 1;

        if entry.is_dir {
            let child = chroot(fs, &entry.name).map_err(|e| traversal_error(fail, &path, e))?;
            walk_dir(&child, &path, tx, stop, fail, sent)?;
        }
    }

    Ok(())
}

fn traversal_error(fail: &CancellationToken, path: &str, err: std::io::Error) -> Error {
    fail.cancel();
    Error::Traversal {
        path: path.to_string(),
        message: err.to_string(),
    }
}
