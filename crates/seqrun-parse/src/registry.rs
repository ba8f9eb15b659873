//! Parser lookup by filename.

use std::path::Path;

use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::trace;

use seqrun_core::ParsedMetadata;

use crate::error::{ParseError, UnsupportedFileType};
use crate::run_info::RunInfoParser;
use crate::run_parameters::RunParametersParser;
use crate::sample_sheet::SampleSheetParser;

/// Uniform interface over the format parsers.
pub trait MetadataParser: Send + Sync {
    /// Read and parse one file.
    fn parse(&self, path: &Path) -> Result<ParsedMetadata, ParseError>;

    /// Check that parsed metadata has the fields downstream consumers need.
    fn validate(&self, metadata: &ParsedMetadata) -> bool;

    /// Parse a file, returning `None` when the result fails validation.
    fn parse_valid(&self, path: &Path) -> Result<Option<ParsedMetadata>, ParseError> {
        let metadata = self.parse(path)?;
        Ok(self.validate(&metadata).then_some(metadata))
    }
}

/// The metadata file kinds this crate can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum MetadataFile {
    /// Run descriptor: run, flowcell and read structure.
    #[strum(to_string = "RunInfo.xml")]
    RunInfo,
    /// Instrument and software settings for the run.
    #[strum(to_string = "RunParameters.xml")]
    RunParameters,
    /// Sample sheet listing the samples on the run.
    #[strum(to_string = "SampleSheet.csv")]
    SampleSheet,
}

static RUN_INFO: RunInfoParser = RunInfoParser;
static RUN_PARAMETERS: RunParametersParser = RunParametersParser;
static SAMPLE_SHEET: SampleSheetParser = SampleSheetParser;

impl MetadataFile {
    /// Conventional filename for this kind inside a run directory.
    pub fn filename(self) -> &'static str {
        match self {
            Self::RunInfo => "RunInfo.xml",
            Self::RunParameters => "RunParameters.xml",
            Self::SampleSheet => "SampleSheet.csv",
        }
    }

    /// The parser bound to this kind.
    pub fn parser(self) -> &'static dyn MetadataParser {
        match self {
            Self::RunInfo => &RUN_INFO,
            Self::RunParameters => &RUN_PARAMETERS,
            Self::SampleSheet => &SAMPLE_SHEET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MatchRule {
    /// Whole filename, ASCII case-insensitive.
    Exact(String),
    /// Extension without the dot, ASCII case-insensitive.
    Extension(String),
}

/// Maps filenames to parsers.
///
/// Exact-name rules are tried before extension rules, each in registration
/// order.
#[derive(Debug, Clone)]
pub struct ParserRegistry {
    rules: Vec<(MatchRule, MetadataFile)>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    /// Create a registry with the built-in rules.
    pub fn new() -> Self {
        let mut rules: Vec<_> = MetadataFile::iter()
            .map(|kind| (MatchRule::Exact(kind.filename().to_string()), kind))
            .collect();
        rules.push((MatchRule::Extension("csv".to_string()), MetadataFile::SampleSheet));
        Self { rules }
    }

    /// Create a registry with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Also accept an exact filename for a kind.
    pub fn with_filename(mut self, filename: impl Into<String>, kind: MetadataFile) -> Self {
        self.rules.push((MatchRule::Exact(filename.into()), kind));
        self
    }

    /// Also accept any filename with this extension for a kind.
    pub fn with_extension(mut self, extension: impl Into<String>, kind: MetadataFile) -> Self {
        let extension = extension.into();
        let extension = extension.trim_start_matches('.').to_string();
        self.rules.push((MatchRule::Extension(extension), kind));
        self
    }

    /// Determine the kind of a file from its name.
    ///
    /// Only the final path component is considered.
    pub fn classify(&self, filename: &str) -> Result<MetadataFile, UnsupportedFileType> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename);

        let exact = self.rules.iter().find_map(|(rule, kind)| match rule {
            MatchRule::Exact(expected) if expected.eq_ignore_ascii_case(name) => Some(*kind),
            _ => None,
        });

        let kind = exact.or_else(|| {
            let extension = Path::new(name).extension()?.to_str()?;
            self.rules.iter().find_map(|(rule, kind)| match rule {
                MatchRule::Extension(expected) if expected.eq_ignore_ascii_case(extension) => {
                    Some(*kind)
                }
                _ => None,
            })
        });

        trace!(filename, kind = ?kind, "Parser lookup");
        kind.ok_or_else(|| UnsupportedFileType::new(filename))
    }

    /// Get the parser for a filename.
    pub fn get_parser(
        &self,
        filename: &str,
    ) -> Result<&'static dyn MetadataParser, UnsupportedFileType> {
        self.classify(filename).map(MetadataFile::parser)
    }

    /// Filenames to probe in a run directory: every exact-name rule in
    /// registration order, skipping names that differ only in ASCII case
    /// from an earlier one.
    pub fn known_filenames(&self) -> impl Iterator<Item = &str> {
        let mut seen: Vec<&str> = Vec::new();
        self.rules.iter().filter_map(move |(rule, _)| match rule {
            MatchRule::Exact(name) if !seen.iter().any(|s| s.eq_ignore_ascii_case(name)) => {
                seen.push(name.as_str());
                Some(name.as_str())
            }
            _ => None,
        })
    }
}
