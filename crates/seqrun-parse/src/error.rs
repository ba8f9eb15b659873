//! Error types for metadata parsing.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// A filename no registered parser accepts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported file type: {filename}")]
pub struct UnsupportedFileType {
    /// The filename that was looked up.
    pub filename: String,
}

impl UnsupportedFileType {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

/// Underlying cause of a [`ParseError`].
#[derive(Debug, Error)]
pub enum ParseErrorKind {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not well-formed XML.
    #[error("Malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The file could not be tokenized as CSV.
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A required XML element is absent.
    #[error("Missing <{0}> element")]
    MissingElement(String),

    /// A required sample sheet section is absent.
    #[error("Missing [{0}] section")]
    MissingSection(String),
}

/// Failure to parse one metadata file.
///
/// Contained to that file: a parse never touches shared state, so the
/// caller may carry on with other files.
#[derive(Debug, Error)]
#[error("Failed to parse {}: {kind}", .path.display())]
pub struct ParseError {
    /// File being parsed.
    pub path: PathBuf,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(path: impl Into<PathBuf>, kind: impl Into<ParseErrorKind>) -> Self {
        Self {
            path: path.into(),
            kind: kind.into(),
        }
    }

    pub(crate) fn missing_element(path: &Path, name: &str) -> Self {
        Self::new(path, ParseErrorKind::MissingElement(name.to_string()))
    }

    pub(crate) fn missing_section(path: &Path, name: &str) -> Self {
        Self::new(path, ParseErrorKind::MissingSection(name.to_string()))
    }
}

/// Read a whole file as UTF-8, closing it before returning.
pub(crate) fn read_source(path: &Path) -> Result<String, ParseError> {
    std::fs::read_to_string(path).map_err(|e| ParseError::new(path, e))
}
