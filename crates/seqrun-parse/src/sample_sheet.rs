//! Sample sheet (`SampleSheet.csv`) parser.
//!
//! Sample sheets are sectioned CSV: a `[Name]` row opens a section and the
//! rows until the next one belong to it. Two layouts exist. Generation 1 has
//! `[Header]`, `[Reads]`, `[Settings]` and `[Data]`. Generation 2 declares
//! `FileFormatVersion` 2 or later in its header and uses application
//! prefixed sections such as `[BCLConvert_Data]` and `[Cloud_Settings]`.

use std::path::Path;

use csv::{ReaderBuilder, Trim};
use indexmap::IndexMap;
use tracing::trace;

use seqrun_core::{MetadataValue, ParsedMetadata};

use crate::error::{ParseError, read_source};
use crate::registry::MetadataParser;

const HEADER: &str = "header";
const READS: &str = "reads";
const SETTINGS: &str = "settings";
const GEN1_DATA: &str = "data";
const GEN2_DATA: &str = "bclconvert_data";
const GEN2_PREFIX: &str = "bclconvert_";
const SAMPLE_ID: &str = "Sample_ID";
const SAMPLE_PROJECT: &str = "Sample_Project";

type Rows = Vec<Vec<String>>;

/// Sections of a sample sheet keyed by lowercased name, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    sections: IndexMap<String, (String, Rows)>,
}

impl Sections {
    /// Rows of a section, looked up case-insensitively.
    pub fn rows(&self, name: &str) -> Option<&[Vec<String>]> {
        self.sections
            .get(&name.to_ascii_lowercase())
            .map(|(_, rows)| rows.as_slice())
    }

    /// Section names as written in the file.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.values().map(|(name, _)| name.as_str())
    }

    /// Look up a key in a key/value section.
    pub fn value(&self, section: &str, key: &str) -> Option<&str> {
        self.rows(section)?
            .iter()
            .find(|row| row[0] == key)
            .and_then(|row| row.get(1))
            .map(String::as_str)
    }

    fn push_row(&mut self, section: &str, row: Vec<String>) {
        if let Some((_, rows)) = self.sections.get_mut(&section.to_ascii_lowercase()) {
            rows.push(row);
        }
    }
}

/// A sample sheet with its schema generation settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSheet {
    GenerationOne(Sections),
    GenerationTwo(Sections),
}

impl SampleSheet {
    /// Split CSV text into sections and detect the generation.
    ///
    /// Rows before the first section header and blank rows are ignored.
    pub fn from_csv(text: &str) -> Result<Self, csv::Error> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let mut sections = Sections::default();
        let mut current: Option<String> = None;

        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            while row.last().is_some_and(String::is_empty) {
                row.pop();
            }
            if row.is_empty() {
                continue;
            }

            if let Some(name) = section_name(&row[0]) {
                let key = name.to_ascii_lowercase();
                sections
                    .sections
                    .entry(key.clone())
                    .or_insert_with(|| (name.to_string(), Vec::new()));
                current = Some(key);
                continue;
            }

            match current.as_deref() {
                Some(section) => sections.push_row(section, row),
                None => trace!(field = %row[0], "Row outside any section"),
            }
        }

        Ok(Self::detect(sections))
    }

    /// Read and split a sample sheet file.
    pub fn read(path: &Path) -> Result<Self, ParseError> {
        let text = read_source(path)?;
        Self::from_csv(&text).map_err(|e| ParseError::new(path, e))
    }

    fn detect(sections: Sections) -> Self {
        let declared_v2 = sections
            .value(HEADER, "FileFormatVersion")
            .and_then(|v| v.parse::<u32>().ok())
            .is_some_and(|v| v >= 2);
        let has_v2_sections = sections.sections.keys().any(|k| k.starts_with(GEN2_PREFIX));

        if declared_v2 || has_v2_sections {
            Self::GenerationTwo(sections)
        } else {
            Self::GenerationOne(sections)
        }
    }

    /// Schema generation, 1 or 2.
    pub fn generation(&self) -> u8 {
        match self {
            Self::GenerationOne(_) => 1,
            Self::GenerationTwo(_) => 2,
        }
    }

    pub fn sections(&self) -> &Sections {
        match self {
            Self::GenerationOne(sections) | Self::GenerationTwo(sections) => sections,
        }
    }

    /// Name of the section that lists samples.
    pub fn data_section(&self) -> &'static str {
        match self {
            Self::GenerationOne(_) => GEN1_DATA,
            Self::GenerationTwo(_) => GEN2_DATA,
        }
    }

    /// Convert to canonical metadata.
    ///
    /// Fails when the `[Header]` section or the generation's data section is
    /// missing; the error names the missing section.
    pub fn into_metadata(self) -> Result<ParsedMetadata, &'static str> {
        let sections = self.sections();
        if sections.rows(HEADER).is_none() {
            return Err("Header");
        }
        if sections.rows(self.data_section()).is_none() {
            return Err(match self {
                Self::GenerationOne(_) => "Data",
                Self::GenerationTwo(_) => "BCLConvert_Data",
            });
        }

        let mut metadata = ParsedMetadata::new();
        metadata.insert("version", self.generation().to_string());

        match &self {
            Self::GenerationOne(sections) => {
                metadata.insert(HEADER, key_values(sections.rows(HEADER).unwrap_or_default()));
                if let Some(rows) = sections.rows(READS) {
                    let reads: Vec<MetadataValue> = rows
                        .iter()
                        .map(|row| MetadataValue::from(row[0].as_str()))
                        .collect();
                    metadata.insert(READS, reads);
                }
                if let Some(rows) = sections.rows(SETTINGS) {
                    metadata.insert(SETTINGS, key_values(rows));
                }
                metadata.insert(GEN1_DATA, records(sections.rows(GEN1_DATA).unwrap_or_default()));

                for (key, (_, rows)) in &sections.sections {
                    if ![HEADER, READS, SETTINGS, GEN1_DATA].contains(&key.as_str()) {
                        metadata.insert(key.as_str(), section_value(key, rows));
                    }
                }
            }
            Self::GenerationTwo(sections) => {
                for (key, (_, rows)) in &sections.sections {
                    metadata.insert(key.as_str(), section_value(key, rows));
                }
            }
        }

        Ok(metadata)
    }
}

fn section_name(field: &str) -> Option<&str> {
    field
        .strip_prefix('[')?
        .strip_suffix(']')
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

fn section_value(key: &str, rows: &[Vec<String>]) -> MetadataValue {
    if key == GEN1_DATA || key.ends_with("_data") {
        records(rows).into()
    } else {
        key_values(rows).into()
    }
}

fn key_values(rows: &[Vec<String>]) -> IndexMap<String, MetadataValue> {
    rows.iter()
        .map(|row| {
            let value = row.get(1).map(String::as_str).unwrap_or_default();
            (row[0].clone(), MetadataValue::from(value))
        })
        .collect()
}

/// Rows after the first become records keyed by the first row's columns.
/// Short rows are padded with empty values; extra fields are dropped.
fn records(rows: &[Vec<String>]) -> Vec<MetadataValue> {
    let Some((columns, body)) = rows.split_first() else {
        return Vec::new();
    };

    body.iter()
        .map(|row| {
            let record: IndexMap<String, MetadataValue> = columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let value = row.get(i).map(String::as_str).unwrap_or_default();
                    (column.clone(), MetadataValue::from(value))
                })
                .collect();
            MetadataValue::from(record)
        })
        .collect()
}

/// Parser for sample sheets of either generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleSheetParser;

impl MetadataParser for SampleSheetParser {
    fn parse(&self, path: &Path) -> Result<ParsedMetadata, ParseError> {
        let sheet = SampleSheet::read(path)?;
        trace!(path = %path.display(), generation = sheet.generation(), "Sample sheet layout");
        sheet
            .into_metadata()
            .map_err(|section| ParseError::missing_section(path, section))
    }

    fn validate(&self, metadata: &ParsedMetadata) -> bool {
        let samples = samples(metadata);
        !samples.is_empty()
            && samples.iter().all(|sample| {
                sample
                    .get(SAMPLE_ID)
                    .is_some_and(|id| !id.is_empty())
            })
    }
}

/// Sample records of parsed sample sheet metadata, for either generation.
pub fn samples(metadata: &ParsedMetadata) -> &[MetadataValue] {
    let section = match metadata.get_str("version") {
        Some("1") => GEN1_DATA,
        Some("2") => GEN2_DATA,
        _ => return &[],
    };
    metadata
        .get(section)
        .and_then(MetadataValue::as_list)
        .unwrap_or_default()
}

/// Distinct, sorted, non-empty `Sample_Project` values.
pub fn projects(metadata: &ParsedMetadata) -> Vec<String> {
    let mut projects: Vec<String> = samples(metadata)
        .iter()
        .filter_map(|sample| sample.get(SAMPLE_PROJECT)?.as_str())
        .filter(|project| !project.is_empty())
        .map(str::to_string)
        .collect();
    projects.sort();
    projects.dedup();
    projects
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEN1: &str = "\
[Header]
IEMFileVersion,5
Date,1/1/2022
Workflow,GenerateFASTQ

[Reads]
151
151

[Settings]
Adapter,CTGTCTCTTATACACATCT

[Data]
Sample_ID,Sample_Name,index,Sample_Project
Sample1,Sample1,TAAGGCGA,ProjectB
Sample2,Sample2,CGTACTAG,ProjectA
Sample3,Sample3,AGGCAGAA,ProjectB
";

    #[test]
    fn test_generation_one_shape() {
        let sheet = SampleSheet::from_csv(GEN1).unwrap();
        assert_eq!(sheet.generation(), 1);

        let metadata = sheet.into_metadata().unwrap();
        assert_eq!(metadata.get_str("version"), Some("1"));
        assert_eq!(
            metadata.get("header").and_then(|h| h.get("Workflow")).and_then(|v| v.as_str()),
            Some("GenerateFASTQ")
        );
        assert_eq!(metadata.get("reads").and_then(|r| r.as_list()).map(<[_]>::len), Some(2));
        assert_eq!(samples(&metadata).len(), 3);
        assert!(SampleSheetParser.validate(&metadata));
    }

    #[test]
    fn test_projects_sorted_and_distinct() {
        let metadata = SampleSheet::from_csv(GEN1).unwrap().into_metadata().unwrap();
        assert_eq!(projects(&metadata), vec!["ProjectA", "ProjectB"]);
    }

    #[test]
    fn test_excel_padding_and_bom() {
        let text = "\u{feff}[Header],,\nIEMFileVersion,4,\n,,\n[Data],,\nSample_ID,Sample_Name,\nS1,,\n";
        let metadata = SampleSheet::from_csv(text).unwrap().into_metadata().unwrap();

        let samples = samples(&metadata);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].get("Sample_ID").and_then(|v| v.as_str()), Some("S1"));
        assert_eq!(samples[0].get("Sample_Name").and_then(|v| v.as_str()), Some(""));
    }

    #[test]
    fn test_absent_optional_sections_are_omitted() {
        let text = "[Header]\nIEMFileVersion,5\n[Reads]\n[Data]\nSample_ID\n";
        let metadata = SampleSheet::from_csv(text).unwrap().into_metadata().unwrap();

        assert_eq!(metadata.get("reads").and_then(|r| r.as_list()).map(<[_]>::len), Some(0));
        assert!(!metadata.contains_key("settings"));
        assert!(samples(&metadata).is_empty());
        assert!(!SampleSheetParser.validate(&metadata));
    }

    #[test]
    fn test_bclconvert_section_implies_generation_two() {
        let text = "[Header]\nRunName,Run1\n[BCLConvert_Data]\nSample_ID,Index\nS1,ACGT\n";
        let sheet = SampleSheet::from_csv(text).unwrap();
        assert_eq!(sheet.generation(), 2);
    }

    #[test]
    fn test_generation_two_sections() {
        let text = "\
[Header]
FileFormatVersion,2
RunName,Test Run

[BCLConvert_Data]
Sample_ID,Index,Index2
Sample1,ATCACGTT,AACGTGAT

[Cloud_Settings]
Cloud_LOT_Enabled,true

[Custom_Section]
Key1,Value1
";
        let metadata = SampleSheet::from_csv(text).unwrap().into_metadata().unwrap();

        let keys: Vec<_> = metadata.keys().collect();
        assert_eq!(
            keys,
            vec!["version", "header", "bclconvert_data", "cloud_settings", "custom_section"]
        );
        assert_eq!(
            metadata.get("custom_section").and_then(|s| s.get("Key1")).and_then(|v| v.as_str()),
            Some("Value1")
        );
        assert!(SampleSheetParser.validate(&metadata));
    }

    #[test]
    fn test_plain_data_section_in_generation_two_is_records() {
        let text = "\
[Header]
FileFormatVersion,2

[BCLConvert_Data]
Sample_ID,Index
S1,ACGTACGT

[Data]
Sample_ID,Sample_Project,Description
S1,ProjA,first
";
        let metadata = SampleSheet::from_csv(text).unwrap().into_metadata().unwrap();

        let data = metadata.get("data").and_then(|d| d.as_list()).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].get("Description").and_then(|v| v.as_str()), Some("first"));
    }

    #[test]
    fn test_missing_sections() {
        let no_header = SampleSheet::from_csv("[Data]\nSample_ID\nS1\n").unwrap();
        assert_eq!(no_header.into_metadata(), Err("Header"));

        let no_data = SampleSheet::from_csv("[Header]\nFileFormatVersion,2\n").unwrap();
        assert_eq!(no_data.into_metadata(), Err("BCLConvert_Data"));
    }

    #[test]
    fn test_blank_sample_id_fails_validation() {
        let text = "[Header]\nIEMFileVersion,5\n[Data]\nSample_ID,Sample_Name\nS1,a\n,b\n";
        let metadata = SampleSheet::from_csv(text).unwrap().into_metadata().unwrap();
        assert!(!SampleSheetParser.validate(&metadata));
    }
}
