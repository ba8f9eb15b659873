//! Metadata parsers for sequencing run files.
//!
//! Each supported file kind is bound to one parser behind the
//! [`MetadataParser`] trait. Look parsers up by filename through a
//! [`ParserRegistry`]:
//!
//! ```no_run
//! use std::path::Path;
//! use seqrun_parse::ParserRegistry;
//!
//! let registry = ParserRegistry::new();
//! let parser = registry.get_parser("RunInfo.xml").unwrap();
//! let metadata = parser.parse(Path::new("/runs/run1/RunInfo.xml")).unwrap();
//! if parser.validate(&metadata) {
//!     println!("run id: {:?}", metadata.get_str("run_id"));
//! }
//! ```
//!
//! Parsing reads the file once and touches no shared state.

mod error;
mod registry;
mod run_info;
mod run_parameters;
mod sample_sheet;

pub use error::{ParseError, ParseErrorKind, UnsupportedFileType};
pub use registry::{MetadataFile, MetadataParser, ParserRegistry};
pub use run_info::{RunInfoParser, parse_run_date, platform_for_instrument};
pub use run_parameters::RunParametersParser;
pub use sample_sheet::{SampleSheet, SampleSheetParser, Sections, projects, samples};

// Re-export the output types for convenience
pub use seqrun_core::{MetadataValue, ParsedMetadata};
