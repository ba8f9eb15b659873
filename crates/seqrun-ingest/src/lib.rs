//! Run discovery and metadata aggregation for seqrun.
//!
//! This crate ties the walker, the validator and the parsers together:
//!
//! - [`MetadataAggregator::parse_directory`] parses whichever known metadata
//!   files a directory holds into one [`RunMetadata`](seqrun_core::RunMetadata),
//!   reporting per-file failures alongside.
//! - [`MetadataAggregator::ingest_candidates`] discovers complete runs of a
//!   sequencer type below a root and yields one outcome per run.
//!
//! ```rust,ignore
//! use seqrun_ingest::MetadataAggregator;
//! use std::path::Path;
//!
//! let aggregator = MetadataAggregator::new();
//! for outcome in aggregator.ingest_candidates(Path::new("/data/runs"), "array_based")? {
//!     match outcome.result {
//!         Ok(report) => println!("{}: {} files", outcome.path.display(), report.metadata.len()),
//!         Err(err) => eprintln!("{}: {err}", outcome.path.display()),
//!     }
//! }
//! ```

mod aggregator;
mod report;

pub use aggregator::{Ingest, MetadataAggregator};
pub use report::{
    AggregateError, DirectoryReport, FailureKind, FileFailure, IngestOutcome, IngestSummary,
    RunState,
};
