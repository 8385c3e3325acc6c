use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::trace;

use super::{ParseStats, ParseStrategy, ParsedFile};
use crate::error::PipelineError;
use crate::parse::utils::clean_str;
use crate::record::{TradeRecord, CANONICAL_COLUMNS};

/// Reader for already-normalized tables: a header row naming the canonical
/// columns (any order, extra columns ignored) and rows in `delimiter`.
#[derive(Debug, Clone, Copy)]
pub struct NormalizedTableStrategy {
    pub delimiter: u8,
}

impl NormalizedTableStrategy {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Position of each canonical column in `headers`, in canonical order.
    fn map_columns(headers: &[String]) -> Result<[usize; 8], PipelineError> {
        let normalized: Vec<String> = headers.iter().map(|h| clean_str(h).to_uppercase()).collect();
        let mut positions = [0usize; 8];
        for (slot, name) in positions.iter_mut().zip(CANONICAL_COLUMNS) {
            *slot = normalized
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PipelineError::MissingColumn {
                    column: name.to_string(),
                    available: headers.to_vec(),
                })?;
        }
        Ok(positions)
    }
}

impl ParseStrategy for NormalizedTableStrategy {
    fn name(&self) -> &'static str {
        "normalized-table"
    }

    fn parse(&self, content: &str) -> Result<ParsedFile> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(Cursor::new(content.as_bytes()));

        let headers: Vec<String> = rdr
            .headers()
            .context("reading header row")?
            .iter()
            .map(str::to_string)
            .collect();
        let positions = Self::map_columns(&headers)?;

        let mut stats = ParseStats::default();
        let mut records = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let row = result.with_context(|| format!("CSV parse error at record {}", idx))?;
            if row.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            stats.data_lines += 1;
            if row.len() != headers.len() {
                trace!(record = idx, fields = row.len(), "skipping ragged row");
                stats.skipped_lines += 1;
                continue;
            }

            let fields: [&str; 8] = positions.map(|p| row.get(p).unwrap_or(""));
            let (record, failures) = TradeRecord::from_fields(&fields);
            stats.coercion_failures += failures;
            stats.accepted += 1;
            records.push(record);
        }

        Ok(ParsedFile { records, stats })
    }
}
