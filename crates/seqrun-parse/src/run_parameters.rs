//! Run parameters (`RunParameters.xml`) parser.
//!
//! Element names drift between instrument families and control software
//! releases, so every output key is looked up through an ordered alias list.
//! Elements are matched anywhere in the document; the first alias present
//! with non-empty text wins.

use std::path::Path;

use roxmltree::Document;

use seqrun_core::ParsedMetadata;

use crate::error::{ParseError, read_source};
use crate::registry::MetadataParser;

/// Output key and the element names that may hold it, in priority order.
const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("run_id", &["RunID", "RunId"]),
    (
        "scanner_id",
        &["ScannerID", "InstrumentID", "InstrumentId", "InstrumentSerialNumber", "ScannerId"],
    ),
    ("rta_version", &["RTAVersion", "RtaVersion"]),
    ("chemistry", &["Chemistry", "ChemistryVersion"]),
    ("application_name", &["ApplicationName", "Application"]),
    (
        "application_version",
        &["ApplicationVersion", "SystemSuiteVersion", "SoftwareVersion"],
    ),
    ("experiment_name", &["ExperimentName"]),
    ("instrument_type", &["InstrumentType", "Platform"]),
    ("workflow_type", &["WorkflowType"]),
    ("sequencing_kit_number", &["SbsKitNumber", "ReagentKitSerialNumber", "KitVersionNumber"]),
    ("run_setup_mode", &["RunSetupMode"]),
    ("flow_cell_mode", &["FlowCellMode"]),
    ("read1_cycles", &["Read1NumberOfCycles", "Read1"]),
    ("read2_cycles", &["Read2NumberOfCycles", "Read2"]),
    ("index1_cycles", &["IndexRead1NumberOfCycles", "Index1Read"]),
    ("index2_cycles", &["IndexRead2NumberOfCycles", "Index2Read"]),
];

const REQUIRED_FIELDS: &[&str] = &["chemistry", "application_version"];

/// Parser for run parameter files.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunParametersParser;

impl MetadataParser for RunParametersParser {
    fn parse(&self, path: &Path) -> Result<ParsedMetadata, ParseError> {
        let text = read_source(path)?;
        let doc = Document::parse(&text).map_err(|e| ParseError::new(path, e))?;

        let mut metadata = ParsedMetadata::new();
        for &(key, aliases) in FIELD_ALIASES {
            if let Some(value) = find_first(&doc, aliases) {
                metadata.insert(key, value);
            }
        }

        Ok(metadata)
    }

    fn validate(&self, metadata: &ParsedMetadata) -> bool {
        REQUIRED_FIELDS.iter().all(|key| metadata.has_value(key))
    }
}

/// Text of the first alias that occurs with non-empty text.
///
/// Alias order takes precedence over document order.
fn find_first<'a>(doc: &'a Document<'_>, aliases: &[&str]) -> Option<&'a str> {
    aliases.iter().find_map(|alias| {
        doc.descendants()
            .filter(|n| n.has_tag_name(*alias))
            .filter_map(|n| n.text())
            .map(str::trim)
            .find(|t| !t.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse_str(xml: &str) -> ParsedMetadata {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("RunParameters.xml");
        fs::write(&path, xml).unwrap();
        RunParametersParser.parse(&path).unwrap()
    }

    #[test]
    fn test_alias_order_beats_document_order() {
        let metadata = parse_str(
            "<RunParameters><InstrumentID>NS1</InstrumentID><ScannerID>M1</ScannerID></RunParameters>",
        );
        assert_eq!(metadata.get_str("scanner_id"), Some("M1"));
    }

    #[test]
    fn test_empty_alias_falls_through() {
        let metadata = parse_str(
            "<RunParameters><RunID> </RunID><RunId>220103_A00001_0001_AHGV7DRXX</RunId></RunParameters>",
        );
        assert_eq!(metadata.get_str("run_id"), Some("220103_A00001_0001_AHGV7DRXX"));
    }

    #[test]
    fn test_novaseq_fields() {
        let metadata = parse_str(
            r#"<?xml version="1.0"?>
<RunParameters>
  <Setup>
    <ApplicationName>NovaSeq Control Software</ApplicationName>
    <ApplicationVersion>1.7.0</ApplicationVersion>
  </Setup>
  <RunId>220103_A00001_0001_AHGV7DRXX</RunId>
  <InstrumentId>A00001</InstrumentId>
  <RTAVersion>3.4.4</RTAVersion>
  <RunSetupMode>SequencingRun</RunSetupMode>
  <FlowCellMode>SP</FlowCellMode>
  <Read1NumberOfCycles>151</Read1NumberOfCycles>
</RunParameters>"#,
        );

        assert_eq!(metadata.get_str("scanner_id"), Some("A00001"));
        assert_eq!(metadata.get_str("run_setup_mode"), Some("SequencingRun"));
        assert_eq!(metadata.get_str("flow_cell_mode"), Some("SP"));
        assert_eq!(metadata.get_str("read1_cycles"), Some("151"));
        assert!(!metadata.contains_key("chemistry"));
        assert!(!metadata.contains_key("experiment_name"));

        // No chemistry label
        assert!(!RunParametersParser.validate(&metadata));
    }
}
