//! Sequencer type table.
//!
//! Each sequencer type is described by data, not code: the files a complete
//! run directory must contain, the sentinel file written when the instrument
//! finishes, and optional discovery hints. New types are added by extending
//! the table (in code or via a TOML file), without touching traversal or
//! parsing logic.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{SequencerConfigError, UnknownSequencerType};

/// Completion indicator written by Illumina real-time analysis.
pub const DEFAULT_COMPLETION_INDICATOR: &str = "RTAComplete.txt";

/// Identifier of the generic array-based (Illumina) sequencer type.
pub const ARRAY_BASED: &str = "array_based";

const ARRAY_REQUIRED_FILES: &[&str] = &["RunInfo.xml", "RunParameters.xml", "SampleSheet.csv"];

// Bulky per-run subtrees that never contain another run.
const ARRAY_EXCLUDED_DIRS: &[&str] = &["Data", "Thumbnail_Images", "InterOp", "Logs"];

const ARRAY_PLATFORMS: &[&str] = &[
    "miseq",
    "nextseq",
    "nextseq2k",
    "novaseq",
    "novaseqxplus",
    "iseq",
];

/// Structural description of one sequencer type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerTypeSpec {
    /// Identifier used to look the type up.
    pub id: String,

    /// Files a complete run directory must directly contain.
    #[serde(default)]
    pub required_files: Vec<String>,

    /// Sentinel file whose presence marks the run as finished.
    #[serde(default = "default_completion_indicator")]
    pub completion_indicator: String,

    /// Glob a run directory's basename must match during discovery.
    #[serde(default)]
    pub dir_pattern: Option<String>,

    /// Deepest level below the search root where runs are looked for.
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Directory basenames never descended into during discovery.
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
}

fn default_completion_indicator() -> String {
    DEFAULT_COMPLETION_INDICATOR.to_string()
}

impl SequencerTypeSpec {
    /// Create a spec with the given required files and completion indicator.
    pub fn new<I, S>(
        id: impl Into<String>,
        required_files: I,
        completion_indicator: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            required_files: required_files.into_iter().map(Into::into).collect(),
            completion_indicator: completion_indicator.into(),
            dir_pattern: None,
            max_depth: None,
            exclude_dirs: Vec::new(),
        }
    }

    /// Set the directory naming glob.
    pub fn with_dir_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.dir_pattern = Some(pattern.into());
        self
    }

    /// Bound the discovery depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the directories skipped during discovery.
    pub fn with_exclude_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    fn array_based(id: &str) -> Self {
        Self::new(id, ARRAY_REQUIRED_FILES.iter().copied(), DEFAULT_COMPLETION_INDICATOR)
            .with_exclude_dirs(ARRAY_EXCLUDED_DIRS.iter().copied())
    }

    /// Check the spec for structural problems.
    pub fn validate(&self) -> Result<(), SequencerConfigError> {
        let invalid = |message: &str| SequencerConfigError::Invalid {
            id: self.id.clone(),
            message: message.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("identifier cannot be empty"));
        }
        if self.completion_indicator.trim().is_empty() {
            return Err(invalid("completion indicator cannot be empty"));
        }
        if self.required_files.iter().any(|f| f.trim().is_empty()) {
            return Err(invalid("required file names cannot be empty"));
        }
        if let Some(ref pattern) = self.dir_pattern {
            globset::Glob::new(pattern).map_err(|e| SequencerConfigError::Invalid {
                id: self.id.clone(),
                message: format!("invalid dir_pattern '{pattern}': {e}"),
            })?;
        }
        Ok(())
    }
}

/// On-disk shape of a sequencer configuration file.
#[derive(Debug, Default, Deserialize)]
struct SequencerFile {
    #[serde(default)]
    sequencer: Vec<SequencerTypeSpec>,
}

/// Immutable lookup table of sequencer types, keyed by identifier.
///
/// Built once at startup and then only read. Iteration order is the order
/// in which types were registered.
#[derive(Debug, Clone)]
pub struct SequencerRegistry {
    specs: IndexMap<String, SequencerTypeSpec>,
}

impl SequencerRegistry {
    /// Create a registry with no types.
    pub fn empty() -> Self {
        Self {
            specs: IndexMap::new(),
        }
    }

    /// Create a registry holding the built-in sequencer types.
    pub fn builtin() -> Self {
        let mut specs = IndexMap::new();

        for id in std::iter::once(ARRAY_BASED).chain(ARRAY_PLATFORMS.iter().copied()) {
            specs.insert(id.to_string(), SequencerTypeSpec::array_based(id));
        }

        // Long-read family A: a single run metadata file, finished on transfer.
        specs.insert(
            "pacbio".to_string(),
            SequencerTypeSpec::new("pacbio", ["metadata.xml"], ".transferdone"),
        );

        // Long-read family B: run summary plus per-read sequencing summary.
        specs.insert(
            "nanopore".to_string(),
            SequencerTypeSpec::new(
                "nanopore",
                ["final_summary.txt", "sequencing_summary.txt"],
                "final_summary.txt",
            )
            .with_exclude_dirs(["fastq_pass", "fastq_fail", "pod5", "fast5"]),
        );

        Self { specs }
    }

    /// Add a type, replacing any existing type with the same identifier.
    pub fn with_spec(mut self, spec: SequencerTypeSpec) -> Result<Self, SequencerConfigError> {
        spec.validate()?;
        self.specs.insert(spec.id.clone(), spec);
        Ok(self)
    }

    /// Build a registry from the built-ins plus the types in a TOML document.
    ///
    /// ```toml
    /// [[sequencer]]
    /// id = "element_aviti"
    /// required_files = ["RunParameters.json", "RunManifest.csv"]
    /// completion_indicator = "RunUploaded.json"
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, SequencerConfigError> {
        Self::builtin().merge_toml_str(content)
    }

    /// Load a TOML sequencer configuration from disk, over the built-ins.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SequencerConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SequencerConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Merge the types of a TOML document into this registry.
    pub fn merge_toml_str(self, content: &str) -> Result<Self, SequencerConfigError> {
        let file: SequencerFile = toml::from_str(content)?;
        file.sequencer
            .into_iter()
            .try_fold(self, |registry, spec| registry.with_spec(spec))
    }

    /// Look up a type by identifier.
    pub fn get(&self, id: &str) -> Result<&SequencerTypeSpec, UnknownSequencerType> {
        self.specs.get(id).ok_or_else(|| UnknownSequencerType::new(id))
    }

    /// Check if a type is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.specs.contains_key(id)
    }

    /// Registered identifiers, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Registered specs, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SequencerTypeSpec> {
        self.specs.values()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for SequencerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
