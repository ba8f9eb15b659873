//! Run directory validation and discovery.
//!
//! Validation is purely structural: a directory is a complete run of a
//! given sequencer type when it directly contains the type's completion
//! indicator and every required file. File contents are never opened.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use seqrun_core::{
    EntryKind, FindOptions, RunCandidate, SequencerRegistry, SequencerTypeSpec,
    UnknownSequencerType, WalkError, WalkWarning,
};

use crate::walker::Find;

/// Errors that prevent run discovery from starting.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The sequencer type is not registered.
    #[error(transparent)]
    UnknownSequencerType(#[from] UnknownSequencerType),

    /// The traversal could not be set up.
    #[error(transparent)]
    Walk(#[from] WalkError),
}

/// A run directory that passed validation.
///
/// Only the validator constructs these, so holding one guarantees the
/// directory contained its completion indicator and required files when it
/// was checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedRun {
    candidate: RunCandidate,
    completion_indicator: String,
}

impl ValidatedRun {
    /// Run directory.
    pub fn path(&self) -> &Path {
        &self.candidate.path
    }

    /// Sequencer type the run was validated against.
    pub fn sequencer_type(&self) -> &str {
        &self.candidate.sequencer_type
    }

    /// Completion indicator that was found.
    pub fn completion_indicator(&self) -> &str {
        &self.completion_indicator
    }

    /// The underlying candidate.
    pub fn candidate(&self) -> &RunCandidate {
        &self.candidate
    }

    /// Consume the run, returning its directory.
    pub fn into_path(self) -> PathBuf {
        self.candidate.path
    }
}

/// Why a candidate directory was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The candidate is not a directory.
    NotADirectory,
    /// The completion indicator is absent; the run may still be writing.
    MissingCompletionIndicator { name: String },
    /// A required file is absent.
    MissingRequiredFile { name: String },
}

/// A candidate that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// The rejected candidate.
    pub candidate: RunCandidate,
    /// The first check that failed.
    pub reason: RejectReason,
}

/// Outcome of validating one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Complete run.
    Accepted(ValidatedRun),
    /// Incomplete or unrelated directory.
    Rejected(Rejection),
}

impl Verdict {
    /// Check if the candidate was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Decides whether directories are complete runs, using a sequencer type
/// table.
#[derive(Debug, Clone, Default)]
pub struct RunValidator {
    registry: SequencerRegistry,
}

impl RunValidator {
    /// Create a validator using the given sequencer types.
    pub fn new(registry: SequencerRegistry) -> Self {
        Self { registry }
    }

    /// Sequencer types known to this validator.
    pub fn registry(&self) -> &SequencerRegistry {
        &self.registry
    }

    /// Validate a candidate directory.
    ///
    /// `completion_indicator` overrides the type's default indicator.
    pub fn check(
        &self,
        dir: &Path,
        sequencer_type: &str,
        completion_indicator: Option<&str>,
    ) -> Result<Verdict, UnknownSequencerType> {
        let spec = self.registry.get(sequencer_type)?;
        let indicator = completion_indicator.unwrap_or(&spec.completion_indicator);
        Ok(check_run(dir, spec, indicator))
    }

    /// Check if a directory is a complete run of the given type.
    pub fn is_valid_run(
        &self,
        dir: &Path,
        sequencer_type: &str,
        completion_indicator: Option<&str>,
    ) -> Result<bool, UnknownSequencerType> {
        self.check(dir, sequencer_type, completion_indicator)
            .map(|verdict| verdict.is_accepted())
    }

    /// Lazily discover complete runs of a type below `root`.
    ///
    /// Directories are walked in the same order as [`Find`]; the root itself
    /// is not considered a candidate. The type's depth bound, excluded
    /// directories and naming glob restrict the walk.
    pub fn find_sequencer_runs(
        &self,
        root: &Path,
        sequencer_type: &str,
        completion_indicator: Option<&str>,
    ) -> Result<SequencerRuns, DiscoveryError> {
        let spec = self.registry.get(sequencer_type)?.clone();
        let indicator = completion_indicator
            .map(str::to_string)
            .unwrap_or_else(|| spec.completion_indicator.clone());

        // Links are not followed, but a link to a directory is still a
        // candidate: runs are often linked into a watch folder.
        let options = FindOptions {
            root: root.to_path_buf(),
            file_type: None,
            min_depth: 1,
            max_depth: spec.max_depth,
            name_pattern: spec.dir_pattern.clone(),
            exclude_dirs: spec.exclude_dirs.clone(),
            follow_links: false,
        };

        debug!(
            root = %root.display(),
            sequencer_type,
            indicator = %indicator,
            "Searching for sequencer runs"
        );

        let walk = Find::new(options)?.with_predicate(|entry| match entry.kind {
            EntryKind::Directory => true,
            EntryKind::Symlink => entry.path.is_dir(),
            EntryKind::File => false,
        });

        Ok(SequencerRuns {
            walk,
            spec,
            indicator,
            accepted: 0,
            rejected: 0,
            on_reject: None,
        })
    }
}

fn check_run(dir: &Path, spec: &SequencerTypeSpec, indicator: &str) -> Verdict {
    let reject = |reason| {
        Verdict::Rejected(Rejection {
            candidate: RunCandidate::new(dir, &spec.id),
            reason,
        })
    };

    if !dir.is_dir() {
        return reject(RejectReason::NotADirectory);
    }

    if !dir.join(indicator).is_file() {
        return reject(RejectReason::MissingCompletionIndicator {
            name: indicator.to_string(),
        });
    }

    if let Some(missing) = spec
        .required_files
        .iter()
        .find(|name| !dir.join(name).is_file())
    {
        return reject(RejectReason::MissingRequiredFile {
            name: missing.clone(),
        });
    }

    Verdict::Accepted(ValidatedRun {
        candidate: RunCandidate::new(dir, &spec.id),
        completion_indicator: indicator.to_string(),
    })
}

type RejectionHandler = Box<dyn FnMut(&Rejection) + Send>;

/// Lazy sequence of complete runs, in walk order.
///
/// Rejected directories are dropped; attach a handler with
/// [`SequencerRuns::on_reject`] to observe them.
pub struct SequencerRuns {
    walk: Find,
    spec: SequencerTypeSpec,
    indicator: String,
    accepted: usize,
    rejected: usize,
    on_reject: Option<RejectionHandler>,
}

impl SequencerRuns {
    /// Observe every rejected candidate as it is dropped.
    pub fn on_reject<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&Rejection) + Send + 'static,
    {
        self.on_reject = Some(Box::new(handler));
        self
    }

    /// Sequencer type being searched for.
    pub fn spec(&self) -> &SequencerTypeSpec {
        &self.spec
    }

    /// Number of runs yielded so far.
    pub fn accepted_count(&self) -> usize {
        self.accepted
    }

    /// Number of candidate directories rejected so far.
    pub fn rejected_count(&self) -> usize {
        self.rejected
    }

    /// Traversal problems encountered so far.
    pub fn warnings(&self) -> &[WalkWarning] {
        self.walk.warnings()
    }
}

impl Iterator for SequencerRuns {
    type Item = ValidatedRun;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.walk.by_ref() {
            match check_run(entry.path(), &self.spec, &self.indicator) {
                Verdict::Accepted(run) => {
                    debug!(
                        path = %run.path().display(),
                        sequencer_type = %self.spec.id,
                        "Run validated"
                    );
                    self.accepted += 1;
                    return Some(run);
                }
                Verdict::Rejected(rejection) => {
                    trace!(path = %entry.path.display(), reason = ?rejection.reason, "Run rejected");
                    self.rejected += 1;
                    if let Some(handler) = self.on_reject.as_mut() {
                        handler(&rejection);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqrun_core::ARRAY_BASED;
    use std::fs;
    use tempfile::TempDir;

    fn write_run(dir: &Path, files: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for name in files {
            fs::write(dir.join(name), "x").unwrap();
        }
    }

    const COMPLETE: &[&str] = &[
        "RunInfo.xml",
        "RunParameters.xml",
        "SampleSheet.csv",
        "RTAComplete.txt",
    ];

    #[test]
    fn test_first_missing_check_is_reported() {
        let temp = TempDir::new().unwrap();
        write_run(temp.path(), &["RTAComplete.txt", "RunInfo.xml"]);

        let verdict = RunValidator::default()
            .check(temp.path(), ARRAY_BASED, None)
            .unwrap();

        match verdict {
            Verdict::Rejected(rejection) => assert_eq!(
                rejection.reason,
                RejectReason::MissingRequiredFile {
                    name: "RunParameters.xml".to_string()
                }
            ),
            Verdict::Accepted(_) => panic!("incomplete run accepted"),
        }
    }

    #[test]
    fn test_indicator_override() {
        let temp = TempDir::new().unwrap();
        write_run(
            temp.path(),
            &["RunInfo.xml", "RunParameters.xml", "SampleSheet.csv", "CopyComplete.txt"],
        );

        let validator = RunValidator::default();
        assert!(!validator.is_valid_run(temp.path(), ARRAY_BASED, None).unwrap());
        assert!(
            validator
                .is_valid_run(temp.path(), ARRAY_BASED, Some("CopyComplete.txt"))
                .unwrap()
        );
    }

    #[test]
    fn test_indicator_must_be_a_file() {
        let temp = TempDir::new().unwrap();
        write_run(temp.path(), &["RunInfo.xml", "RunParameters.xml", "SampleSheet.csv"]);
        fs::create_dir(temp.path().join("RTAComplete.txt")).unwrap();

        assert!(
            !RunValidator::default()
                .is_valid_run(temp.path(), ARRAY_BASED, None)
                .unwrap()
        );
    }

    #[test]
    fn test_discovery_skips_excluded_dirs() {
        let temp = TempDir::new().unwrap();
        write_run(&temp.path().join("run1"), COMPLETE);
        // A complete-looking directory inside an excluded subtree is ignored.
        write_run(&temp.path().join("run1/Data/nested"), COMPLETE);

        let runs: Vec<_> = RunValidator::default()
            .find_sequencer_runs(temp.path(), ARRAY_BASED, None)
            .unwrap()
            .map(ValidatedRun::into_path)
            .collect();

        assert_eq!(runs, vec![temp.path().join("run1")]);
    }

    #[test]
    fn test_discovery_counts_and_reports_rejections() {
        let temp = TempDir::new().unwrap();
        write_run(&temp.path().join("a_run"), COMPLETE);
        write_run(&temp.path().join("b_running"), &["RunInfo.xml"]);

        let rejected = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = rejected.clone();
        let mut runs = RunValidator::default()
            .find_sequencer_runs(temp.path(), ARRAY_BASED, None)
            .unwrap()
            .on_reject(move |r| sink.lock().unwrap().push(r.clone()));

        assert!(runs.next().is_some());
        assert!(runs.next().is_none());
        assert_eq!(runs.accepted_count(), 1);
        assert_eq!(runs.rejected_count(), 1);

        let rejected = rejected.lock().unwrap();
        assert_eq!(rejected[0].candidate.path, temp.path().join("b_running"));
        assert!(matches!(
            rejected[0].reason,
            RejectReason::MissingCompletionIndicator { .. }
        ));
    }

    #[test]
    fn test_discovery_unknown_type() {
        let temp = TempDir::new().unwrap();
        let result = RunValidator::default().find_sequencer_runs(temp.path(), "sanger", None);
        assert!(matches!(result, Err(DiscoveryError::UnknownSequencerType(_))));
    }
}
