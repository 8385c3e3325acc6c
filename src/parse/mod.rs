// src/parse/mod.rs
use anyhow::{Context, Result};
use serde::Serialize;
use std::{fmt, fs, path::Path};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::record::TradeRecord;
use crate::table::sniff_delimiter;

pub mod normalized;
pub mod raw_export;
pub mod utils;

pub use normalized::NormalizedTableStrategy;
pub use raw_export::RawExportStrategy;

/// Line counters for one parsed file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    /// Non-blank lines after the header.
    pub data_lines: usize,
    pub accepted: usize,
    /// Lines dropped for having the wrong number of fields.
    pub skipped_lines: usize,
    /// Non-empty numeric fields that were read as null.
    pub coercion_failures: usize,
}

#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub records: Vec<TradeRecord>,
    pub stats: ParseStats,
}

/// One way of turning file content into canonical records.
pub trait ParseStrategy {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<ParsedFile>;
}

/// Layout of a source file, judged from its first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileShape {
    /// `;`-separated quoted export whose header is thrown away.
    RawExport,
    /// Regular table with canonical column names.
    Table { delimiter: u8 },
    Unrecognized,
}

impl fmt::Display for FileShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileShape::RawExport => write!(f, "raw export"),
            FileShape::Table { delimiter } => {
                write!(f, "table ('{}')", (*delimiter as char).escape_default())
            }
            FileShape::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// More than 3 semicolons on the first line means a raw export; otherwise
/// any known delimiter means a regular table.
pub fn detect_shape(content: &str) -> FileShape {
    let first = content.lines().next().unwrap_or("");
    if first.matches(';').count() > 3 {
        return FileShape::RawExport;
    }
    match sniff_delimiter(first) {
        Some(delimiter) => FileShape::Table { delimiter },
        None => FileShape::Unrecognized,
    }
}

pub fn strategy_for(shape: FileShape) -> Option<Box<dyn ParseStrategy>> {
    match shape {
        FileShape::RawExport => Some(Box::new(RawExportStrategy)),
        FileShape::Table { delimiter } => Some(Box::new(NormalizedTableStrategy::new(delimiter))),
        FileShape::Unrecognized => None,
    }
}

/// Detect the layout of `content` and parse it with the matching strategy.
pub fn parse_content(content: &str) -> Result<(FileShape, ParsedFile)> {
    let shape = detect_shape(content);
    let strategy = strategy_for(shape).ok_or(PipelineError::UnrecognizedShape)?;
    debug!(strategy = strategy.name(), "parsing content");
    let parsed = strategy
        .parse(content)
        .with_context(|| format!("{} parse failed", strategy.name()))?;
    Ok((shape, parsed))
}

/// Read one source file from disk, decoding Latin-1 when it is not UTF-8.
pub fn read_source<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (text, latin1) = utils::decode_bytes(&bytes);
    if latin1 {
        warn!(path = %path.display(), "not valid UTF-8, decoded as Latin-1");
    }
    Ok(text)
}

#[tracing::instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<(FileShape, ParsedFile)> {
    let text = read_source(&path)?;
    parse_content(&text).with_context(|| format!("parsing {}", path.as_ref().display()))
}
