//! Directory traversal and run discovery for seqrun.
//!
//! # Overview
//!
//! `seqrun-scan` finds candidate run directories and decides which of them
//! are complete runs:
//!
//! - **Lazy traversal** via [`find`], a pull-based iterator that visits
//!   siblings in lexicographic order and never descends into the same real
//!   directory twice
//! - **Run validation** via [`RunValidator`], driven entirely by the
//!   sequencer type table in `seqrun-core`
//! - **Discovery** via [`RunValidator::find_sequencer_runs`], composing both
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use seqrun_scan::{RunValidator, ARRAY_BASED};
//!
//! let validator = RunValidator::default();
//! for run in validator.find_sequencer_runs(Path::new("/data/runs"), ARRAY_BASED, None).unwrap() {
//!     println!("Complete run: {}", run.path().display());
//! }
//! ```
//!
//! # Custom traversals
//!
//! ```rust,no_run
//! use seqrun_scan::{find, EntryKind, FindOptions};
//!
//! let options = FindOptions::builder()
//!     .root("/data/runs")
//!     .file_type(EntryKind::File)
//!     .name_pattern("*.fastq.gz")
//!     .exclude_dir("Thumbnail_Images")
//!     .build()
//!     .unwrap();
//!
//! for entry in find(options).unwrap().with_predicate(|e| e.depth <= 4) {
//!     println!("{}", entry.path.display());
//! }
//! ```

mod validator;
mod visited;
mod walker;

pub use validator::{
    DiscoveryError, RejectReason, Rejection, RunValidator, SequencerRuns, ValidatedRun, Verdict,
};
pub use visited::VisitedDirs;
pub use walker::{Find, find};

// Re-export core types for convenience
pub use seqrun_core::{
    ARRAY_BASED, EntryKind, FileSystemEntry, FindOptions, RunCandidate, SequencerRegistry,
    SequencerTypeSpec, UnknownSequencerType, WalkError, WalkWarning, WarningKind,
};
