//! Visited-directory tracking for cycle avoidance.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Tracks the real paths of directories already descended into.
///
/// Symlinks and bind mounts can make one directory reachable through many
/// paths. Each traversal owns one tracker and descends into a given real
/// directory at most once.
#[derive(Debug, Default)]
pub struct VisitedDirs {
    seen: HashSet<PathBuf>,
}

impl VisitedDirs {
    /// Create a new tracker.
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    /// Track a directory. Returns `true` if this is the first time its real
    /// path has been seen.
    ///
    /// A path that cannot be resolved is tracked as given.
    pub fn track(&mut self, path: &Path) -> bool {
        let real = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.seen.insert(real)
    }

    /// Check if a directory has been seen (without tracking).
    pub fn has_seen(&self, path: &Path) -> bool {
        let real = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.seen.contains(&real)
    }

    /// Get the number of distinct directories tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if no directories have been tracked.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
