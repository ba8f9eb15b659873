//! Results of metadata extraction.

use std::path::{Path, PathBuf};

use serde::Serialize;
use strum::Display;
use thiserror::Error;

use seqrun_core::{RunMetadata, UnknownSequencerType, WalkError};
use seqrun_scan::DiscoveryError;

/// Lifecycle of a run directory through discovery and extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    /// Yielded by the walker as a candidate.
    Discovered,
    /// Accepted by the validator.
    Validated,
    /// Dropped by the validator. Terminal.
    Rejected,
    /// Metadata aggregated, possibly with per-file failures. Terminal.
    MetadataExtracted,
    /// The directory itself could not be processed. Terminal.
    ExtractionFailed,
}

/// Directory-level failures.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The directory does not exist.
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// The path exists but is not a directory.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The directory listing could not be read.
    #[error("Failed to read directory {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sequencer type is not registered.
    #[error(transparent)]
    UnknownSequencerType(#[from] UnknownSequencerType),

    /// Run discovery could not be set up.
    #[error(transparent)]
    Walk(#[from] WalkError),
}

impl From<DiscoveryError> for AggregateError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::UnknownSequencerType(e) => Self::UnknownSequencerType(e),
            DiscoveryError::Walk(e) => Self::Walk(e),
        }
    }
}

/// Why a single file contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// The file could not be read or parsed.
    ParseError,
    /// The file parsed but lacks required fields.
    ValidationFailed,
}

/// A metadata file that was present but contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    /// Canonical filename of the file kind.
    pub filename: String,
    /// Path that was parsed.
    pub path: PathBuf,
    pub kind: FailureKind,
    /// Human-readable cause.
    pub message: String,
}

/// Metadata of one directory plus the files that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryReport {
    pub metadata: RunMetadata,
    pub failures: Vec<FileFailure>,
}

impl DirectoryReport {
    pub fn new(metadata: RunMetadata) -> Self {
        Self {
            metadata,
            failures: Vec::new(),
        }
    }

    /// Check if every file found parsed and validated.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failure recorded for a given filename, if any.
    pub fn failure(&self, filename: &str) -> Option<&FileFailure> {
        self.failures.iter().find(|f| f.filename == filename)
    }
}

/// Outcome of extracting one validated run.
#[derive(Debug)]
pub struct IngestOutcome {
    pub path: PathBuf,
    pub result: Result<DirectoryReport, AggregateError>,
}

impl IngestOutcome {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Terminal state of the run.
    pub fn state(&self) -> RunState {
        match self.result {
            Ok(_) => RunState::MetadataExtracted,
            Err(_) => RunState::ExtractionFailed,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Counts for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Candidate directories rejected by the validator.
    pub rejected: usize,
    /// Runs whose metadata was extracted.
    pub extracted: usize,
    /// Runs that failed at the directory level.
    pub failed: usize,
    /// Files that failed to parse or validate across all extracted runs.
    pub file_failures: usize,
}

impl IngestSummary {
    /// Record one outcome.
    pub fn record(&mut self, outcome: &IngestOutcome) {
        match &outcome.result {
            Ok(report) => {
                self.extracted += 1;
                self.file_failures += report.failures.len();
            }
            Err(_) => self.failed += 1,
        }
    }

    /// Runs that reached a terminal extraction state.
    pub fn total(&self) -> usize {
        self.extracted + self.failed
    }
}
