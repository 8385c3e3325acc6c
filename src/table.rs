// src/table.rs
use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::{fs, io::Cursor, path::Path};
use tracing::debug;

use crate::error::PipelineError;
use crate::parse::read_source;

pub const COMMA: u8 = b',';
pub const TAB: u8 = b'\t';
pub const SEMICOLON: u8 = b';';

/// A header-plus-rows delimited table held as strings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Column names, as written in the header line.
    pub headers: Vec<String>,
    /// Each data row, one String per column.
    pub rows: Vec<Vec<String>>,
}

/// Pick the delimiter of a header line: whichever of comma, tab or
/// semicolon occurs most often. Ties prefer that order.
pub fn sniff_delimiter(line: &str) -> Option<u8> {
    let mut best: Option<(u8, usize)> = None;
    for d in [COMMA, TAB, SEMICOLON] {
        let n = line.bytes().filter(|&b| b == d).count();
        if n > 0 && best.map_or(true, |(_, m)| n > m) {
            best = Some((d, n));
        }
    }
    best.map(|(d, _)| d)
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Like `column_index`, but a missing column is a schema error.
    pub fn require_column(&self, name: &str) -> Result<usize, PipelineError> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::MissingColumn {
                column: name.to_string(),
                available: self.headers.clone(),
            })
    }

    /// Parse delimited text with a header row. Rows must have as many
    /// fields as the header.
    pub fn parse(text: &str, delimiter: u8) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .from_reader(Cursor::new(text.as_bytes()));

        let headers: Vec<String> = rdr
            .headers()
            .context("reading header row")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(PipelineError::EmptyFile.into());
        }

        let mut rows = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    /// Read a table from disk, detecting the delimiter from its header line.
    /// Non-UTF-8 files are decoded as Latin-1 with a warning.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = read_source(path)?;
        let first = text.lines().next().ok_or(PipelineError::EmptyFile)?;
        let delimiter = sniff_delimiter(first).unwrap_or(COMMA);
        debug!(path = %path.display(), delimiter = %(delimiter as char).escape_default(), "reading table");
        Self::parse(&text, delimiter).with_context(|| format!("parsing {}", path.display()))
    }

    /// Write header + rows as UTF-8 delimited text.
    pub fn write<P: AsRef<Path>>(&self, path: P, delimiter: u8) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let mut wtr = WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        wtr.write_record(&self.headers)
            .context("writing header row")?;
        for row in &self.rows {
            wtr.write_record(row).context("writing row")?;
        }
        wtr.flush()
            .with_context(|| format!("flushing {}", path.display()))?;
        Ok(())
    }
}
