//! Canonical metadata structures.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single metadata value: text, an ordered list, or a nested mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Scalar text value. Numbers are kept verbatim as text.
    Text(String),
    /// Ordered list of values.
    List(Vec<MetadataValue>),
    /// Insertion-ordered mapping.
    Map(IndexMap<String, MetadataValue>),
}

impl MetadataValue {
    /// Get the text of a scalar value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the items of a list value.
    pub fn as_list(&self) -> Option<&[MetadataValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the entries of a mapping value.
    pub fn as_map(&self) -> Option<&IndexMap<String, MetadataValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key of a mapping value.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Check if the value is empty text, an empty list, or an empty map.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(map) => map.is_empty(),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<MetadataValue>> for MetadataValue {
    fn from(items: Vec<MetadataValue>) -> Self {
        Self::List(items)
    }
}

impl From<IndexMap<String, MetadataValue>> for MetadataValue {
    fn from(map: IndexMap<String, MetadataValue>) -> Self {
        Self::Map(map)
    }
}

/// The output of one parser for one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedMetadata(IndexMap<String, MetadataValue>);

impl ParsedMetadata {
    /// Create an empty metadata mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Remove a field.
    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.0.shift_remove(key)
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    /// Look up a text field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetadataValue::as_str)
    }

    /// Check if a field is present and non-empty.
    pub fn has_value(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Check if a field is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying mapping.
    pub fn into_inner(self) -> IndexMap<String, MetadataValue> {
        self.0
    }
}

impl From<IndexMap<String, MetadataValue>> for ParsedMetadata {
    fn from(map: IndexMap<String, MetadataValue>) -> Self {
        Self(map)
    }
}

/// A directory proposed as a run of a given sequencer type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunCandidate {
    /// Directory path.
    pub path: PathBuf,
    /// Sequencer type identifier.
    pub sequencer_type: String,
}

impl RunCandidate {
    /// Create a new candidate.
    pub fn new(path: impl Into<PathBuf>, sequencer_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sequencer_type: sequencer_type.into(),
        }
    }
}

/// Canonical metadata for one run directory, keyed by source filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Run directory.
    pub path: PathBuf,
    /// Sequencer type identifier, when known.
    pub sequencer_type: Option<String>,
    /// Parsed metadata per source filename.
    pub files: IndexMap<String, ParsedMetadata>,
}

impl RunMetadata {
    /// Create an empty aggregate for a directory.
    pub fn new(path: impl Into<PathBuf>, sequencer_type: Option<String>) -> Self {
        Self {
            path: path.into(),
            sequencer_type,
            files: IndexMap::new(),
        }
    }

    /// Run directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the metadata parsed from one file.
    pub fn insert(&mut self, filename: impl Into<String>, metadata: ParsedMetadata) {
        self.files.insert(filename.into(), metadata);
    }

    /// Metadata parsed from a given file.
    pub fn get(&self, filename: &str) -> Option<&ParsedMetadata> {
        self.files.get(filename)
    }

    /// Check if a file contributed metadata.
    pub fn contains(&self, filename: &str) -> bool {
        self.files.contains_key(filename)
    }

    /// Source filenames in the order they were parsed.
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Number of files that contributed metadata.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if no file contributed metadata.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
