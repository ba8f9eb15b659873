//! Traversal configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::entry::EntryKind;

/// Configuration for a `find` traversal.
///
/// The optional predicate is not part of the configuration: it is attached
/// to the traversal iterator itself, since closures cannot be serialized.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct FindOptions {
    /// Root directory to search.
    pub root: PathBuf,

    /// Restrict results to one entry type (None = all types).
    #[builder(setter(into, strip_option), default)]
    #[serde(default)]
    pub file_type: Option<EntryKind>,

    /// Minimum depth of yielded entries (root = 0).
    #[builder(default = "0")]
    #[serde(default)]
    pub min_depth: usize,

    /// Maximum depth of yielded entries (None = unlimited).
    #[builder(setter(into, strip_option), default)]
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Glob matched against the basename of each entry.
    #[builder(setter(into, strip_option), default)]
    #[serde(default)]
    pub name_pattern: Option<String>,

    /// Directory basenames that are neither yielded nor descended into.
    #[builder(default, setter(each(name = "exclude_dir", into)))]
    #[serde(default)]
    pub exclude_dirs: Vec<String>,

    /// Descend into symlinked directories.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_links: bool,
}

impl FindOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }

        if let (Some(min), Some(Some(max))) = (self.min_depth, self.max_depth) {
            if min > max {
                return Err(format!("min_depth ({min}) exceeds max_depth ({max})"));
            }
        }
        Ok(())
    }
}

impl FindOptions {
    /// Create a new options builder.
    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::default()
    }

    /// Create options that yield every entry under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file_type: None,
            min_depth: 0,
            max_depth: None,
            name_pattern: None,
            exclude_dirs: Vec::new(),
            follow_links: false,
        }
    }

    /// Check if a directory basename is excluded from traversal.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
    }

    /// Check if a depth lies within the configured bounds.
    pub fn depth_in_range(&self, depth: usize) -> bool {
        depth >= self.min_depth && self.max_depth.is_none_or(|max| depth <= max)
    }
}

impl Default for FindOptions {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = FindOptions::builder()
            .root("/data/runs")
            .file_type(EntryKind::Directory)
            .min_depth(1usize)
            .max_depth(3usize)
            .exclude_dir("Data")
            .exclude_dir("Logs")
            .build()
            .unwrap();

        assert_eq!(options.root, PathBuf::from("/data/runs"));
        assert_eq!(options.file_type, Some(EntryKind::Directory));
        assert_eq!(options.max_depth, Some(3));
        assert_eq!(options.exclude_dirs, vec!["Data", "Logs"]);
        assert!(!options.follow_links);
    }

    #[test]
    fn test_options_builder_requires_root() {
        assert!(FindOptions::builder().build().is_err());
        assert!(FindOptions::builder().root("").build().is_err());
    }

    #[test]
    fn test_options_builder_rejects_inverted_depths() {
        let result = FindOptions::builder()
            .root("/data")
            .min_depth(4usize)
            .max_depth(2usize)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_depth_in_range() {
        let mut options = FindOptions::new("/data");
        assert!(options.depth_in_range(0));
        assert!(options.depth_in_range(100));

        options.min_depth = 1;
        options.max_depth = Some(2);
        assert!(!options.depth_in_range(0));
        assert!(options.depth_in_range(1));
        assert!(options.depth_in_range(2));
        assert!(!options.depth_in_range(3));
    }

    #[test]
    fn test_is_excluded() {
        let options = FindOptions::builder()
            .root("/data")
            .exclude_dirs(vec!["Thumbnail_Images".to_string()])
            .build()
            .unwrap();

        assert!(options.is_excluded("Thumbnail_Images"));
        assert!(!options.is_excluded("thumbnail_images"));
    }
}
