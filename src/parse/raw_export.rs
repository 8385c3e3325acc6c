use anyhow::Result;
use tracing::trace;

use super::{ParseStats, ParseStrategy, ParsedFile};
use crate::parse::utils::strip_quotes;
use crate::record::TradeRecord;

/// Line-by-line reader for the raw `;`-separated trade exports.
///
/// - The first line is a header and is always dropped, whatever it holds.
/// - Blank lines are ignored.
/// - Every other line is split on `;`, all `"` are removed, and the line is
///   kept only when it yields exactly 8 fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawExportStrategy;

impl ParseStrategy for RawExportStrategy {
    fn name(&self) -> &'static str {
        "raw-export"
    }

    fn parse(&self, content: &str) -> Result<ParsedFile> {
        let mut stats = ParseStats::default();
        let mut records = Vec::new();

        for (idx, line) in content.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            stats.data_lines += 1;

            let parts: Vec<String> = line.split(';').map(strip_quotes).collect();
            let fields: &[String; 8] = match parts.as_slice().try_into() {
                Ok(f) => f,
                Err(_) => {
                    trace!(line = idx + 1, fields = parts.len(), "skipping malformed line");
                    stats.skipped_lines += 1;
                    continue;
                }
            };

            let (record, failures) = TradeRecord::from_fields(fields);
            stats.coercion_failures += failures;
            stats.accepted += 1;
            records.push(record);
        }

        Ok(ParsedFile { records, stats })
    }
}
