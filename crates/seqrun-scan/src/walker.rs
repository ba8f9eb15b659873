//! Lazy, deterministic directory traversal.

use std::path::Path;

use globset::{Glob, GlobMatcher};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use seqrun_core::{EntryKind, FileSystemEntry, FindOptions, WalkError, WalkWarning, WarningKind};

use crate::visited::VisitedDirs;

type Predicate = Box<dyn FnMut(&FileSystemEntry) -> bool + Send>;

/// Start a traversal. Shorthand for [`Find::new`].
pub fn find(options: FindOptions) -> Result<Find, WalkError> {
    Find::new(options)
}

/// A single-pass traversal of a directory tree.
///
/// Entries are produced depth-first, siblings in lexicographic order of
/// their basename. Each call to `next` does at most the directory reads and
/// stats needed to produce the next entry; nothing is read ahead and
/// dropping the iterator needs no cleanup. The traversal cannot be
/// restarted: call [`find`] again for a fresh one.
///
/// Unreadable entries are skipped and recorded as warnings. A root that
/// does not exist or is not a directory produces an empty traversal.
pub struct Find {
    inner: Option<walkdir::IntoIter>,
    options: FindOptions,
    matcher: Option<GlobMatcher>,
    predicate: Option<Predicate>,
    visited: VisitedDirs,
    warnings: Vec<WalkWarning>,
}

impl Find {
    /// Set up a traversal.
    ///
    /// Fails only for an invalid name pattern or inconsistent depth bounds.
    pub fn new(options: FindOptions) -> Result<Self, WalkError> {
        if let Some(max) = options.max_depth {
            if options.min_depth > max {
                return Err(WalkError::InvalidConfig {
                    message: format!("min_depth ({}) exceeds max_depth ({max})", options.min_depth),
                });
            }
        }

        let matcher = options
            .name_pattern
            .as_deref()
            .map(|pattern| {
                Glob::new(pattern)
                    .map(|glob| glob.compile_matcher())
                    .map_err(|source| WalkError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    })
            })
            .transpose()?;

        let inner = if options.root.is_dir() {
            let mut walker = WalkDir::new(&options.root)
                .follow_links(options.follow_links)
                .sort_by_file_name();
            if let Some(max) = options.max_depth {
                walker = walker.max_depth(max);
            }
            Some(walker.into_iter())
        } else {
            debug!(root = %options.root.display(), "Search root is not a directory, nothing to walk");
            None
        };

        Ok(Self {
            inner,
            options,
            matcher,
            predicate: None,
            visited: VisitedDirs::new(),
            warnings: Vec::new(),
        })
    }

    /// Attach a final filter, evaluated only on entries that passed every
    /// structural filter.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: FnMut(&FileSystemEntry) -> bool + Send + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Options this traversal was created with.
    pub fn options(&self) -> &FindOptions {
        &self.options
    }

    /// Problems encountered so far. Each affected entry was skipped.
    pub fn warnings(&self) -> &[WalkWarning] {
        &self.warnings
    }

    /// Take the warnings collected so far, leaving none behind.
    pub fn take_warnings(&mut self) -> Vec<WalkWarning> {
        std::mem::take(&mut self.warnings)
    }

    fn skip_current_dir(&mut self) {
        if let Some(inner) = self.inner.as_mut() {
            inner.skip_current_dir();
        }
    }

    fn record_error(&mut self, err: walkdir::Error) {
        let path = err
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.options.root.clone());

        let warning = if let Some(ancestor) = err.loop_ancestor() {
            WalkWarning::new(
                path,
                format!("Symlink loop back to {}", ancestor.display()),
                WarningKind::SymlinkLoop,
            )
        } else if let Some(io) = err.io_error() {
            WalkWarning::from_io(path, io)
        } else {
            WalkWarning::new(path, err.to_string(), WarningKind::ReadError)
        };

        warn!(path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Apply the filters to one raw entry, pruning excluded or already
    /// visited directories as a side effect.
    fn admit(&mut self, dent: walkdir::DirEntry) -> Option<FileSystemEntry> {
        let depth = dent.depth();
        let file_type = dent.file_type();

        // Only directories the walker will descend into are pruned here; a
        // symlink that is not followed reports a symlink file type.
        if file_type.is_dir() {
            if depth > 0 && self.options.is_excluded(&dent.file_name().to_string_lossy()) {
                trace!(path = %dent.path().display(), "Excluded directory");
                self.skip_current_dir();
                return None;
            }

            if !self.visited.track(dent.path()) {
                let warning = WalkWarning::already_visited(dent.path());
                debug!(path = %warning.path.display(), "{}", warning.message);
                self.warnings.push(warning);
                self.skip_current_dir();
            }
        } else if file_type.is_symlink()
            && depth > 0
            && self.options.is_excluded(&dent.file_name().to_string_lossy())
            && dent.path().is_dir()
        {
            // Not descended into, so there is nothing to prune.
            trace!(path = %dent.path().display(), "Excluded directory link");
            return None;
        }

        // With `follow_links` links are transparent and report their target.
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            trace!(path = %dent.path().display(), "Skipping special file");
            return None;
        };

        if !self.options.depth_in_range(depth) {
            return None;
        }

        if self.options.file_type.is_some_and(|wanted| wanted != kind) {
            return None;
        }

        if let Some(ref matcher) = self.matcher {
            if !matcher.is_match(Path::new(dent.file_name())) {
                return None;
            }
        }

        let entry = FileSystemEntry::new(dent.into_path(), kind, depth);

        if let Some(predicate) = self.predicate.as_mut() {
            if !predicate(&entry) {
                return None;
            }
        }

        Some(entry)
    }
}

impl Iterator for Find {
    type Item = FileSystemEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.inner.as_mut()?.next()?;
            match next {
                Ok(dent) => {
                    if let Some(entry) = self.admit(dent) {
                        return Some(entry);
                    }
                }
                Err(err) => self.record_error(err),
            }
        }
    }
}
