//! Filesystem entries produced during traversal.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Type tag of a filesystem entry.
///
/// Parses from either the long name (`file`, `directory`, `symlink`) or the
/// single-letter form used by `find -type` (`f`, `d`, `l`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    #[strum(to_string = "file", serialize = "f")]
    File,
    /// Directory.
    #[strum(to_string = "directory", serialize = "d", serialize = "dir")]
    Directory,
    /// Symbolic link (reported as a link, not as its target).
    #[strum(to_string = "symlink", serialize = "l", serialize = "link")]
    Symlink,
}

impl EntryKind {
    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }
}

/// A single entry yielded by a traversal.
///
/// Entries are ephemeral: the walker produces them one at a time and never
/// keeps them after they have been handed to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemEntry {
    /// Path of the entry (the search root joined with the relative path).
    pub path: PathBuf,
    /// Type tag.
    pub kind: EntryKind,
    /// Depth relative to the search root (root = 0).
    pub depth: usize,
}

impl FileSystemEntry {
    /// Create a new entry.
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind, depth: usize) -> Self {
        Self {
            path: path.into(),
            kind,
            depth,
        }
    }

    /// Path of the entry.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Basename of the entry, if it is valid UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Consume the entry, returning its path.
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}
