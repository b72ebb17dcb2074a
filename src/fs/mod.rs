//! The filesystem adapter behind the scanner.
//!
//! The scanner never touches `std::fs` directly; it goes through the
//! [`FileSystem`] trait so that platform-specific implementations (or test
//! doubles) can be swapped in. The contract is small: expand a user path,
//! check existence, stat without following symlinks, and enumerate a
//! directory lazily. Each enumerated [`Entry`] carries either a resolved
//! stat or `None` to signal a per-entry access failure that the caller
//! counts and skips.

use std::fs;
use std::io;
use std::path::Path;

use directories::BaseDirs;

/// Normalizes path separators to forward slashes.
///
/// All paths inside the scan tree use `/` regardless of platform so that
/// pattern matching works on one canonical form.
pub fn norm_sep(path: &str) -> String {
    if path.contains('\\') {
        path.replace('\\', "/")
    } else {
        path.to_string()
    }
}

pub(crate) fn path_to_string(path: &Path) -> String {
    norm_sep(&path.to_string_lossy())
}

/// The result of a no-follow stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatInfo {
    /// Logical size in bytes.
    pub size: u64,
    /// Allocated size in bytes; falls back to `size` when the platform
    /// cannot report allocation.
    pub disk_usage: u64,
    /// True for directories. Symlinks report false.
    pub is_dir: bool,
}

/// One directory entry with its stat resolved eagerly.
///
/// `stat` is `None` when the entry could not be stat'ed or its name could
/// not be decoded; the scanner counts such entries as access errors.
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: String,
    pub name: String,
    pub stat: Option<StatInfo>,
}

/// Capability set the scanner requires from the platform.
pub trait FileSystem: Send + Sync {
    /// Expands a leading `~` to the user's home directory.
    fn expand_user(&self, path: &str) -> String;

    /// Whether the path exists (without following a trailing symlink).
    fn exists(&self, path: &str) -> bool;

    /// Turns a path into an absolute, forward-slash form without resolving
    /// symlinks along the way.
    fn absolute(&self, path: &str) -> io::Result<String>;

    /// Stats a path without following symlinks.
    fn stat(&self, path: &str) -> io::Result<StatInfo>;

    /// Lazily enumerates a directory. Failing to open the directory is an
    /// error; failing to stat an individual entry yields that entry with
    /// `stat: None`.
    fn scan_dir(&self, path: &str) -> io::Result<Box<dyn Iterator<Item = Entry> + Send>>;
}

/// The standard-library backed [`FileSystem`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl OsFileSystem {
    fn stat_metadata(md: &fs::Metadata) -> StatInfo {
        StatInfo {
            size: md.len(),
            disk_usage: allocated_size(md),
            is_dir: md.is_dir(),
        }
    }
}

impl FileSystem for OsFileSystem {
    fn expand_user(&self, path: &str) -> String {
        expand_user(path)
    }

    fn exists(&self, path: &str) -> bool {
        // symlink_metadata so that a dangling symlink still "exists".
        fs::symlink_metadata(path).is_ok()
    }

    fn absolute(&self, path: &str) -> io::Result<String> {
        std::path::absolute(path).map(|p| path_to_string(&p))
    }

    fn stat(&self, path: &str) -> io::Result<StatInfo> {
        fs::symlink_metadata(path).map(|md| Self::stat_metadata(&md))
    }

    fn scan_dir(&self, path: &str) -> io::Result<Box<dyn Iterator<Item = Entry> + Send>> {
        let read_dir = fs::read_dir(path)?;
        let iter = read_dir.map(|dirent| {
            // An error mid-iteration carries no name; surface it as a
            // stat-less entry so the caller counts it.
            let Ok(dirent) = dirent else {
                return Entry {
                    path: String::new(),
                    name: String::new(),
                    stat: None,
                };
            };
            let path = path_to_string(&dirent.path());
            let name = dirent.file_name().to_string_lossy().into_owned();
            let stat = dirent
                .metadata()
                .ok()
                .map(|md| OsFileSystem::stat_metadata(&md));
            Entry { path, name, stat }
        });
        Ok(Box::new(iter))
    }
}

/// Expands a leading `~` to the current user's home directory.
pub fn expand_user(path: &str) -> String {
    if path == "~" {
        if let Some(base) = BaseDirs::new() {
            return path_to_string(base.home_dir());
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(base) = BaseDirs::new() {
            return format!("{}/{}", path_to_string(base.home_dir()), rest);
        }
    }
    path.to_string()
}

#[cfg(unix)]
fn allocated_size(md: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    md.blocks() * 512
}

#[cfg(not(unix))]
fn allocated_size(md: &fs::Metadata) -> u64 {
    md.len()
}
