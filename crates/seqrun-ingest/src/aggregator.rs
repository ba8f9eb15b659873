//! Directory metadata aggregation.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use seqrun_core::{RunMetadata, WalkWarning};
use seqrun_parse::{MetadataFile, MetadataParser, ParserRegistry, platform_for_instrument};
use seqrun_scan::{RunValidator, SequencerRuns, ValidatedRun};

use crate::report::{
    AggregateError, DirectoryReport, FailureKind, FileFailure, IngestOutcome, IngestSummary,
    RunState,
};

/// Turns run directories into canonical metadata.
#[derive(Debug, Clone, Default)]
pub struct MetadataAggregator {
    validator: RunValidator,
    parsers: ParserRegistry,
}

impl MetadataAggregator {
    /// Create an aggregator with the built-in sequencer types and parsers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom validator, for instance one with extra sequencer types.
    pub fn with_validator(mut self, validator: RunValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Use a custom parser registry.
    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn validator(&self) -> &RunValidator {
        &self.validator
    }

    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    /// Parse every known metadata file present in a directory.
    ///
    /// Files are matched by name ignoring ASCII case; absent files are
    /// skipped. A file that fails to parse or validate is reported in
    /// [`DirectoryReport::failures`] and does not affect the others. Only a
    /// missing or unreadable directory is an error.
    pub fn parse_directory(&self, dir: &Path) -> Result<DirectoryReport, AggregateError> {
        if !dir.exists() {
            return Err(AggregateError::DirectoryNotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(AggregateError::NotADirectory(dir.to_path_buf()));
        }

        let present = list_files(dir)?;
        let mut report = DirectoryReport::new(RunMetadata::new(dir, None));

        for filename in self.parsers.known_filenames() {
            let Some(path) = locate(&present, dir, filename) else {
                trace!(dir = %dir.display(), filename, "Metadata file absent");
                continue;
            };
            match self.parsers.get_parser(filename) {
                Ok(parser) => parse_file(parser, filename, path, &mut report),
                Err(err) => debug!(path = %path.display(), "{err}"),
            }
        }

        report.metadata.sequencer_type = report
            .metadata
            .get(MetadataFile::RunInfo.filename())
            .and_then(|run_info| run_info.get_str("instrument"))
            .and_then(platform_for_instrument)
            .map(str::to_string);

        debug!(
            dir = %dir.display(),
            files = report.metadata.len(),
            failures = report.failures.len(),
            "Directory parsed"
        );
        Ok(report)
    }

    /// Extract metadata from one validated run.
    ///
    /// The run's sequencer type takes precedence over the one inferred from
    /// the instrument serial.
    pub fn extract(&self, run: ValidatedRun) -> IngestOutcome {
        debug!(path = %run.path().display(), state = %RunState::Validated, "Run state");

        let result = self.parse_directory(run.path()).map(|mut report| {
            report.metadata.sequencer_type = Some(run.sequencer_type().to_string());
            report
        });

        let outcome = IngestOutcome {
            path: run.into_path(),
            result,
        };
        match &outcome.result {
            Ok(_) => debug!(path = %outcome.path.display(), state = %outcome.state(), "Run state"),
            Err(err) => warn!(path = %outcome.path.display(), state = %outcome.state(), "{err}"),
        }
        outcome
    }

    /// Discover complete runs of a type below `root` and extract each.
    ///
    /// Fails up front for an unknown sequencer type or a missing root. After
    /// that every validated run yields exactly one outcome, in walk order,
    /// whatever happens to the others.
    pub fn ingest_candidates(
        &self,
        root: &Path,
        sequencer_type: &str,
    ) -> Result<Ingest<'_>, AggregateError> {
        self.ingest_candidates_with_indicator(root, sequencer_type, None)
    }

    /// Like [`ingest_candidates`](Self::ingest_candidates) with an overridden
    /// completion indicator.
    pub fn ingest_candidates_with_indicator(
        &self,
        root: &Path,
        sequencer_type: &str,
        completion_indicator: Option<&str>,
    ) -> Result<Ingest<'_>, AggregateError> {
        let runs = self.discover(root, sequencer_type, completion_indicator)?;

        info!(root = %root.display(), sequencer_type, "Ingesting runs");
        Ok(Ingest {
            aggregator: self,
            runs,
            summary: IngestSummary::default(),
            finished: false,
        })
    }

    /// Lazily discover complete runs without extracting them.
    ///
    /// Unlike [`RunValidator::find_sequencer_runs`], a missing root is an
    /// error rather than an empty result.
    pub fn discover(
        &self,
        root: &Path,
        sequencer_type: &str,
        completion_indicator: Option<&str>,
    ) -> Result<SequencerRuns, AggregateError> {
        if !root.exists() {
            return Err(AggregateError::DirectoryNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(AggregateError::NotADirectory(root.to_path_buf()));
        }

        let runs = self
            .validator
            .find_sequencer_runs(root, sequencer_type, completion_indicator)?
            .on_reject(|rejection| {
                trace!(
                    path = %rejection.candidate.path.display(),
                    state = %RunState::Rejected,
                    reason = ?rejection.reason,
                    "Run state"
                );
            });
        Ok(runs)
    }

    /// Extract many runs on the rayon thread pool.
    ///
    /// Outcomes come back in the order of `runs`.
    pub fn extract_all(&self, runs: Vec<ValidatedRun>) -> Vec<IngestOutcome> {
        runs.into_par_iter().map(|run| self.extract(run)).collect()
    }
}

/// Parse one file into the report, recording a failure instead of metadata
/// when it does not parse or validate.
fn parse_file(
    parser: &dyn MetadataParser,
    filename: &str,
    path: PathBuf,
    report: &mut DirectoryReport,
) {
    let failure = match parser.parse(&path) {
        Ok(metadata) if parser.validate(&metadata) => {
            report.metadata.insert(filename, metadata);
            return;
        }
        Ok(_) => FileFailure {
            filename: filename.to_string(),
            message: format!("{} is missing required fields", path.display()),
            path,
            kind: FailureKind::ValidationFailed,
        },
        Err(err) => FileFailure {
            filename: filename.to_string(),
            message: err.to_string(),
            path,
            kind: FailureKind::ParseError,
        },
    };

    warn!(path = %failure.path.display(), kind = %failure.kind, "{}", failure.message);
    report.failures.push(failure);
}

/// Regular files directly inside `dir`.
fn list_files(dir: &Path) -> Result<Vec<String>, AggregateError> {
    let entries = fs::read_dir(dir).map_err(|source| AggregateError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}

/// Path of `filename` in `dir`, preferring an exact match over one that
/// differs only in ASCII case.
fn locate(present: &[String], dir: &Path, filename: &str) -> Option<PathBuf> {
    present
        .iter()
        .find(|name| name.as_str() == filename)
        .or_else(|| present.iter().find(|name| name.eq_ignore_ascii_case(filename)))
        .map(|name| dir.join(name))
}

/// Lazy batch ingestion, one [`IngestOutcome`] per validated run.
pub struct Ingest<'a> {
    aggregator: &'a MetadataAggregator,
    runs: SequencerRuns,
    summary: IngestSummary,
    finished: bool,
}

impl Ingest<'_> {
    /// Counts so far. Complete once the iterator is exhausted.
    pub fn summary(&self) -> IngestSummary {
        IngestSummary {
            rejected: self.runs.rejected_count(),
            ..self.summary
        }
    }

    /// Traversal problems encountered so far.
    pub fn warnings(&self) -> &[WalkWarning] {
        self.runs.warnings()
    }
}

impl Iterator for Ingest<'_> {
    type Item = IngestOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        match self.runs.next() {
            Some(run) => {
                let outcome = self.aggregator.extract(run);
                self.summary.record(&outcome);
                Some(outcome)
            }
            None => {
                if !self.finished {
                    self.finished = true;
                    let summary = self.summary();
                    info!(
                        extracted = summary.extracted,
                        failed = summary.failed,
                        rejected = summary.rejected,
                        file_failures = summary.file_failures,
                        "Ingest complete"
                    );
                }
                None
            }
        }
    }
}
