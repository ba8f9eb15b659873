//! Run descriptor (`RunInfo.xml`) parser.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use roxmltree::{Document, Node};

use seqrun_core::{MetadataValue, ParsedMetadata};

use crate::error::{ParseError, read_source};
use crate::registry::MetadataParser;

/// Child elements of `<Run>` copied verbatim.
const RUN_FIELDS: &[(&str, &str)] = &[
    ("flowcell", "Flowcell"),
    ("instrument", "Instrument"),
    ("date", "Date"),
];

const READ_ATTRIBUTES: &[(&str, &str)] = &[
    ("number", "Number"),
    ("num_cycles", "NumCycles"),
    ("is_indexed_read", "IsIndexedRead"),
];

const LAYOUT_ATTRIBUTES: &[(&str, &str)] = &[
    ("lane_count", "LaneCount"),
    ("surface_count", "SurfaceCount"),
    ("swath_count", "SwathCount"),
    ("tile_count", "TileCount"),
];

/// Instrument serial prefixes. The longest matching prefix wins.
const INSTRUMENT_PREFIXES: &[(&str, &str)] = &[
    ("M", "miseq"),
    ("MN", "miniseq"),
    ("NS", "nextseq"),
    ("NDX", "nextseq2k"),
    ("A", "novaseq"),
    ("LH", "novaseqxplus"),
    ("D", "hiseq"),
    ("FSQ", "iseq"),
];

/// Elements of `<Run>` with dedicated handling.
const KNOWN_ELEMENTS: &[&str] = &["Flowcell", "Instrument", "Date", "Reads", "FlowcellLayout"];

/// Parser for run descriptor files.
///
/// Produces `run_id`, `run_number`, `flowcell`, `instrument`, `date`,
/// `run_date` (ISO form of `date`, when recognized), `reads` and
/// `flowcell_layout`. Absent elements leave their key out. Any other child
/// of `<Run>` is kept under its snake_case name, nested elements as maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunInfoParser;

impl MetadataParser for RunInfoParser {
    fn parse(&self, path: &Path) -> Result<ParsedMetadata, ParseError> {
        let text = read_source(path)?;
        let doc = Document::parse(&text).map_err(|e| ParseError::new(path, e))?;

        let run = doc
            .descendants()
            .find(|n| n.has_tag_name("Run"))
            .ok_or_else(|| ParseError::missing_element(path, "Run"))?;

        let mut metadata = ParsedMetadata::new();

        if let Some(id) = run.attribute("Id") {
            metadata.insert("run_id", id);
        }
        if let Some(number) = run.attribute("Number") {
            metadata.insert("run_number", number);
        }

        for &(key, tag) in RUN_FIELDS {
            if let Some(text) = child_text(run, tag) {
                metadata.insert(key, text);
            }
        }

        if let Some(date) = metadata.get_str("date").and_then(parse_run_date) {
            metadata.insert("run_date", date.format("%Y-%m-%d").to_string());
        }

        if let Some(reads) = child(run, "Reads") {
            let reads: Vec<MetadataValue> = reads
                .children()
                .filter(|n| n.has_tag_name("Read"))
                .map(|read| attributes(read, READ_ATTRIBUTES).into())
                .collect();
            metadata.insert("reads", reads);
        }

        if let Some(layout) = child(run, "FlowcellLayout") {
            metadata.insert("flowcell_layout", attributes(layout, LAYOUT_ATTRIBUTES));
        }

        for extra in run
            .children()
            .filter(|n| n.is_element() && !KNOWN_ELEMENTS.contains(&n.tag_name().name()))
        {
            let key = snake_case(extra.tag_name().name());
            if let Some(value) = element_value(extra) {
                if !metadata.contains_key(&key) {
                    metadata.insert(key, value);
                }
            }
        }

        Ok(metadata)
    }

    fn validate(&self, metadata: &ParsedMetadata) -> bool {
        metadata.has_value("run_id")
            && metadata
                .get("reads")
                .and_then(MetadataValue::as_list)
                .is_some_and(|reads| !reads.is_empty())
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    child(node, tag)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn attributes(node: Node<'_, '_>, names: &[(&str, &str)]) -> IndexMap<String, MetadataValue> {
    names
        .iter()
        .filter_map(|&(key, attr)| {
            node.attribute(attr)
                .map(|value| (key.to_string(), MetadataValue::from(value)))
        })
        .collect()
}

/// Text of a leaf element, or a map of its element children.
fn element_value(node: Node<'_, '_>) -> Option<MetadataValue> {
    if node.children().any(|n| n.is_element()) {
        let map: IndexMap<String, MetadataValue> = node
            .children()
            .filter(|n| n.is_element())
            .filter_map(|n| Some((snake_case(n.tag_name().name()), element_value(n)?)))
            .collect();
        return Some(map.into());
    }
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(MetadataValue::from)
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_uppercase() {
            let after_lower = prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit());
            let ends_acronym = prev.is_some_and(|p| p.is_ascii_uppercase())
                && chars.peek().is_some_and(|n| n.is_ascii_lowercase());
            if after_lower || ends_acronym {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Map an instrument serial to its platform name.
///
/// ```
/// use seqrun_parse::platform_for_instrument;
///
/// assert_eq!(platform_for_instrument("M00001"), Some("miseq"));
/// assert_eq!(platform_for_instrument("MN00123"), Some("miniseq"));
/// assert_eq!(platform_for_instrument("X1"), None);
/// ```
pub fn platform_for_instrument(instrument: &str) -> Option<&'static str> {
    INSTRUMENT_PREFIXES
        .iter()
        .filter(|(prefix, _)| instrument.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|&(_, platform)| platform)
}

/// Parse the run date formats instruments write.
///
/// Accepts `YYMMDD`, `M/D/YYYY` with an optional trailing time, and ISO 8601
/// dates or timestamps.
pub fn parse_run_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if value.len() == 6 && value.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(value, "%y%m%d").ok();
    }

    if value.contains('/') {
        let date = value.split_whitespace().next()?;
        return NaiveDate::parse_from_str(date, "%m/%d/%Y").ok();
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(timestamp.date());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
