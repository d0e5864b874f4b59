//! Read-only virtual filesystems over repository contents
//!
//! Extraction never reads a repository through `std::fs` directly. It goes
//! through the [`VirtualFs`] trait, a read-only view of a repository at a
//! pinned revision that supports three operations: list a directory, ask
//! whether a path is a directory, and open a file. Scoping a view to a
//! subdirectory with [`chroot`] yields a new handle whose `/` is that
//! subdirectory.
//!
//! Two implementations are provided:
//!
//! - [`MemoryFs`]: an in-memory tree, used for tests and benchmarks and for
//!   any source that is already loaded into memory.
//! - [`DiskFs`]: a view over a checked-out worktree on disk. It hides the
//!   `.git` directory and rejects `..` components and symbolic links, so a
//!   configured source path can never escape the worktree.
//!
//! All paths are absolute and slash-separated; they are normalized with
//! [`full_path`] before use.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;

use crate::error::{Error, Result};
use crate::path::{full_path, relative};

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsEntry {
    /// Base name of the entry
    pub name: String,
    pub is_dir: bool,
    /// Unix permission bits as recorded by the source
    pub mode: u32,
}

/// A read-only hierarchical view of repository contents.
///
/// Implementations must be safe to share between the walker and the
/// materializer threads; nothing in the extraction pipeline mutates them.
pub trait VirtualFs: Send + Sync {
    /// List the children of the directory at `path`, sorted by name.
    fn read_dir(&self, path: &str) -> io::Result<Vec<VfsEntry>>;

    /// Whether `path` is a directory. Missing paths are an error.
    fn is_dir(&self, path: &str) -> io::Result<bool>;

    /// Open the file at `path` for reading.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>>;
}

/// Scope `fs` to the directory at `path`.
///
/// Fails with `NotFound` when the path is missing and `NotADirectory` when it
/// names a file.
pub fn chroot(fs: &Arc<dyn VirtualFs>, path: &str) -> io::Result<Arc<dyn VirtualFs>> {
    if !fs.is_dir(path)? {
        return Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("{} is not a directory", full_path("", path)),
        ));
    }

    Ok(Arc::new(ChrootFs {
        inner: Arc::clone(fs),
        root: full_path("", path),
    }))
}

/// A view of another filesystem rooted at one of its subdirectories.
struct ChrootFs {
    inner: Arc<dyn VirtualFs>,
    root: String,
}

impl VirtualFs for ChrootFs {
    fn read_dir(&self, path: &str) -> io::Result<Vec<VfsEntry>> {
        self.inner.read_dir(&full_path(&self.root, path))
    }

    fn is_dir(&self, path: &str) -> io::Result<bool> {
        self.inner.is_dir(&full_path(&self.root, path))
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        self.inner.open(&full_path(&self.root, path))
    }
}

/// Represents a file with content and metadata
#[derive(Debug, Clone)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
    /// File permissions (simplified as u32)
    pub permissions: u32,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            permissions: DEFAULT_FILE_MODE,
        }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    /// Get file size in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// In-memory directory tree.
///
/// Adding a file implicitly creates its parent directories. Empty
/// directories must be added explicitly with [`MemoryFs::add_dir`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<String, File>,
    dirs: BTreeSet<String>,
}

impl MemoryFs {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file, creating any missing parent directories.
    pub fn add_file(&mut self, path: &str, file: File) -> Result<()> {
        let path = full_path("", path);
        if path == "/" || self.dirs.contains(&path) {
            return Err(Error::Filesystem {
                message: format!("{} is a directory", path),
            });
        }
        self.add_parents(&path)?;
        self.files.insert(path, file);
        Ok(())
    }

    /// Add a file with string content
    pub fn add_file_string(&mut self, path: &str, content: &str) -> Result<()> {
        self.add_file(path, File::from_string(content))
    }

    /// Add a directory (and its parents).
    pub fn add_dir(&mut self, path: &str) -> Result<()> {
        let path = full_path("", path);
        if path == "/" {
            return Ok(());
        }
        if self.files.contains_key(&path) {
            return Err(Error::Filesystem {
                message: format!("{} is a file", path),
            });
        }
        self.add_parents(&path)?;
        self.dirs.insert(path);
        Ok(())
    }

    fn add_parents(&mut self, path: &str) -> Result<()> {
        let mut current = String::new();
        let segments: Vec<&str> = relative(path).split('/').collect();
        for segment in &segments[..segments.len() - 1] {
            current = full_path(&current, segment);
            if self.files.contains_key(&current) {
                return Err(Error::Filesystem {
                    message: format!("{} is a file", current),
                });
            }
            self.dirs.insert(current.clone());
        }
        Ok(())
    }

    /// Check if a file or directory exists
    pub fn exists(&self, path: &str) -> bool {
        let path = full_path("", path);
        path == "/" || self.files.contains_key(&path) || self.dirs.contains(&path)
    }

    /// Get a file by path
    pub fn get_file(&self, path: &str) -> Option<&File> {
        self.files.get(&full_path("", path))
    }

    /// Number of files (directories are not counted)
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if filesystem has no files and no directories
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Iterate over all files as (path, file) pairs in path order
    pub fn files(&self) -> impl Iterator<Item = (&String, &File)> {
        self.files.iter()
    }

    /// Freeze the tree into a shareable handle.
    pub fn into_shared(self) -> Arc<dyn VirtualFs> {
        Arc::new(self)
    }
}

/// Children of `dir` among `keys`, which must be sorted.
fn direct_children<'a>(
    keys: impl Iterator<Item = &'a String>,
    dir: &str,
) -> impl Iterator<Item = &'a str> {
    let prefix = if dir == "/" {
        "/".to_string()
    } else {
        format!("{}/", dir)
    };
    keys.filter_map(move |key| {
        key.strip_prefix(prefix.as_str())
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
    })
}

impl VirtualFs for MemoryFs {
    fn read_dir(&self, path: &str) -> io::Result<Vec<VfsEntry>> {
        let path = full_path("", path);
        if !self.is_dir(&path)? {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", path),
            ));
        }

        let mut entries: Vec<VfsEntry> = direct_children(self.dirs.iter(), &path)
            .map(|name| VfsEntry {
                name: name.to_string(),
                is_dir: true,
                mode: DEFAULT_DIR_MODE,
            })
            .collect();
        for name in direct_children(self.files.keys(), &path) {
            let mode = self.files[&full_path(&path, name)].permissions;
            entries.push(VfsEntry {
                name: name.to_string(),
                is_dir: false,
                mode,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn is_dir(&self, path: &str) -> io::Result<bool> {
        let path = full_path("", path);
        if path == "/" || self.dirs.contains(&path) {
            Ok(true)
        } else if self.files.contains_key(&path) {
            Ok(false)
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path),
            ))
        }
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        let path = full_path("", path);
        match self.files.get(&path) {
            Some(file) => Ok(Box::new(Cursor::new(file.content.as_slice()))),
            None if self.is_dir(&path).unwrap_or(false) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path),
            )),
        }
    }
}

/// Read-only view of a checked-out worktree on disk.
#[derive(Debug, Clone)]
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a logical path onto the worktree.
    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let path = full_path("", path);
        let rel = relative(&path);
        let mut segments = rel.split('/').filter(|s| !s.is_empty());
        if segments.clone().any(|s| s == "..") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} escapes the repository root", path),
            ));
        }
        if segments.next() == Some(".git") {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path),
            ));
        }

        // Symlinks anywhere along the way could point outside the worktree.
        let mut resolved = self.root.clone();
        let mut logical = String::new();
        for segment in rel.split('/').filter(|s| !s.is_empty()) {
            resolved.push(segment);
            logical = full_path(&logical, segment);
            if fs::symlink_metadata(&resolved)?.file_type().is_symlink() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} is a symbolic link", logical),
                ));
            }
        }
        Ok(resolved)
    }
}

#[cfg(unix)]
fn mode_of(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(metadata: &fs::Metadata) -> u32 {
    if metadata.is_dir() {
        DEFAULT_DIR_MODE
    } else {
        DEFAULT_FILE_MODE
    }
}

impl VirtualFs for DiskFs {
    fn read_dir(&self, path: &str) -> io::Result<Vec<VfsEntry>> {
        let dir = self.resolve(path)?;
        let at_root = relative(&full_path("", path)).is_empty();

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().into_string().map_err(|raw| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non UTF-8 file name {:?} in {}", raw, dir.display()),
                )
            })?;
            if at_root && name == ".git" {
                continue;
            }

            let metadata = entry.metadata()?;
            if metadata.file_type().is_symlink() {
                warn!("Skipping symbolic link {}", entry.path().display());
                continue;
            }
            entries.push(VfsEntry {
                name,
                is_dir: metadata.is_dir(),
                mode: mode_of(&metadata),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn is_dir(&self, path: &str) -> io::Result<bool> {
        Ok(fs::metadata(self.resolve(path)?)?.is_dir())
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(fs::File::open(self.resolve(path)?)?))
    }
}
