//! Error and warning types shared across the workspace.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that prevent a traversal from being set up.
///
/// Problems encountered *during* a traversal are never errors; they are
/// recorded as [`WalkWarning`]s and the entry is skipped.
#[derive(Debug, Error)]
pub enum WalkError {
    /// The name pattern is not a valid glob.
    #[error("Invalid name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// A sequencer type identifier with no registered specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown sequencer type: {id}")]
pub struct UnknownSequencerType {
    /// The identifier that was looked up.
    pub id: String,
}

impl UnknownSequencerType {
    /// Create a new error for the given identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Errors loading or validating the sequencer type table.
#[derive(Debug, Error)]
pub enum SequencerConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read sequencer config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has the wrong shape.
    #[error("Malformed sequencer config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A sequencer type specification is invalid.
    #[error("Invalid sequencer type '{id}': {message}")]
    Invalid { id: String, message: String },
}

/// Kind of traversal warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading a directory or entry.
    ReadError,
    /// Following a symlink would revisit an ancestor directory.
    SymlinkLoop,
    /// Directory already descended into through another path.
    AlreadyVisited,
}

/// Non-fatal problem encountered during traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl WalkWarning {
    /// Create a new traversal warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning from an I/O error, classifying permission problems.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self {
                message: format!("Permission denied: {}", path.display()),
                path,
                kind: WarningKind::PermissionDenied,
            },
            _ => Self {
                message: format!("Read error: {error}"),
                path,
                kind: WarningKind::ReadError,
            },
        }
    }

    /// Create a warning for a directory reached a second time.
    pub fn already_visited(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Directory already visited: {}", path.display()),
            path,
            kind: WarningKind::AlreadyVisited,
        }
    }
}
