//! Core types for seqrun.
//!
//! This crate provides the data model shared by the rest of the workspace:
//! traversal entries and options, the sequencer type table, and the
//! canonical metadata structures handed to downstream consumers.

mod config;
mod entry;
mod error;
mod metadata;
mod sequencer;

pub use config::{FindOptions, FindOptionsBuilder, FindOptionsBuilderError};
pub use entry::{EntryKind, FileSystemEntry};
pub use error::{SequencerConfigError, UnknownSequencerType, WalkError, WalkWarning, WarningKind};
pub use metadata::{MetadataValue, ParsedMetadata, RunCandidate, RunMetadata};
pub use sequencer::{
    ARRAY_BASED, DEFAULT_COMPLETION_INDICATOR, SequencerRegistry, SequencerTypeSpec,
};
