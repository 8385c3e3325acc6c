// src/merge.rs
use anyhow::{Context, Result};
use glob::{glob, Pattern};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::parse::parse_file;
use crate::record::{records_to_table, TradeRecord};
use crate::report::PipelineObserver;
use crate::table::TAB;

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeSummary {
    pub municipality: i64,
    pub files_found: usize,
    pub files_parsed: usize,
    pub files_skipped: usize,
    pub records_parsed: usize,
    pub records_matched: usize,
    pub records_per_year: BTreeMap<i64, usize>,
    pub records_without_year: usize,
}

/// Source files in `dir` matching `pattern`, in sorted path order. Only
/// `pattern` is treated as a glob; `dir` is matched literally.
pub fn discover_sources<P: AsRef<Path>>(dir: P, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = format!("{}/{}", Pattern::escape(&dir.as_ref().to_string_lossy()), pattern);
    let paths: Vec<PathBuf> = glob(&full)
        .with_context(|| format!("Failed to read glob pattern '{}'", full))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    if paths.is_empty() {
        return Err(PipelineError::NoSourceFiles { pattern: full }.into());
    }
    debug!(count = paths.len(), "discovered source files");
    Ok(paths)
}

fn in_municipality(record: &TradeRecord, municipality: i64) -> bool {
    record.municipality_code == Some(municipality)
}

/// Keep only the records of `municipality`, in their original order.
pub fn filter_municipality(records: Vec<TradeRecord>, municipality: i64) -> Vec<TradeRecord> {
    records
        .into_iter()
        .filter(|r| in_municipality(r, municipality))
        .collect()
}

/// Filter each source and concatenate them in iteration order. Records are
/// never deduplicated across sources.
pub fn merge_sources<I>(sources: I, municipality: i64) -> Vec<TradeRecord>
where
    I: IntoIterator<Item = Vec<TradeRecord>>,
{
    sources
        .into_iter()
        .flat_map(|records| filter_municipality(records, municipality))
        .collect()
}

/// Stable sort by (year, month); nulls last.
pub fn order_by_period(records: &mut [TradeRecord]) {
    records.sort_by_key(|r| (r.year.is_none(), r.year, r.month.is_none(), r.month));
}

/// Filter stage: parse every source, keep one municipality, write the merged
/// dataset as tab-separated text.
///
/// Unreadable or unparsable sources are reported and skipped. If no record
/// matches, nothing is written and `PipelineError::NoMatchingRecords` is
/// returned.
#[tracing::instrument(level = "info", skip(sources, output, observer), fields(files = sources.len()))]
pub fn run_filter_stage<P: AsRef<Path>>(
    sources: &[PathBuf],
    municipality: i64,
    chronological: bool,
    output: P,
    observer: &dyn PipelineObserver,
) -> Result<MergeSummary> {
    let output = output.as_ref();
    let mut summary = MergeSummary {
        municipality,
        files_found: sources.len(),
        ..Default::default()
    };

    let mut parsed_sources: Vec<Vec<TradeRecord>> = Vec::with_capacity(sources.len());
    for source in sources {
        let (shape, parsed) = match parse_file(source) {
            Ok(ok) => ok,
            Err(err) => {
                summary.files_skipped += 1;
                observer.source_skipped(source, &err);
                continue;
            }
        };
        summary.files_parsed += 1;
        summary.records_parsed += parsed.records.len();

        let matched = parsed
            .records
            .iter()
            .filter(|r| in_municipality(r, municipality))
            .count();
        observer.source_parsed(source, shape, &parsed.stats, matched);
        parsed_sources.push(parsed.records);
    }

    let mut merged = merge_sources(parsed_sources, municipality);

    if merged.is_empty() {
        return Err(PipelineError::NoMatchingRecords { municipality }.into());
    }

    if chronological {
        order_by_period(&mut merged);
    }

    for r in &merged {
        match r.year {
            Some(y) => *summary.records_per_year.entry(y).or_insert(0) += 1,
            None => summary.records_without_year += 1,
        }
    }
    summary.records_matched = merged.len();

    records_to_table(&merged)
        .write(output, TAB)
        .with_context(|| format!("writing merged dataset {}", output.display()))?;
    info!(records = merged.len(), path = %output.display(), "wrote merged dataset");

    observer.merged(output, &summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SilentObserver;
    use crate::table::Table;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str = "\"CO_ANO\";\"CO_MES\";\"SH4\";\"CO_PAIS\";\"SG_UF_MUN\";\"CO_MUN\";\"KG_LIQUIDO\";\"VL_FOB\"\n";

    fn rec(year: &str, month: &str, mun: &str, fob: &str) -> TradeRecord {
        TradeRecord::from_fields(&[year, month, "100", "76", "PR", mun, "1", fob]).0
    }

    #[test]
    fn test_merge_keeps_order_and_duplicates() {
        let a = vec![rec("2021", "1", "1", "1"), rec("2020", "1", "2", "2"), rec("2020", "5", "1", "3")];
        let b = vec![rec("2020", "1", "1", "3"), rec("2019", "1", "1", "4")];
        let merged = merge_sources(vec![a, b], 1);
        let fobs: Vec<f64> = merged.iter().filter_map(|r| r.fob_value).collect();
        assert_eq!(fobs, vec![1.0, 3.0, 3.0, 4.0]);
    }

    #[test]
    fn test_order_by_period_is_stable() {
        let mut records = vec![
            rec("2021", "1", "1", "1"),
            rec("2020", "2", "1", "2"),
            rec("", "1", "1", "3"),
            rec("2020", "2", "1", "4"),
            rec("2020", "1", "1", "5"),
        ];
        order_by_period(&mut records);
        let fobs: Vec<f64> = records.iter().filter_map(|r| r.fob_value).collect();
        assert_eq!(fobs, vec![5.0, 2.0, 4.0, 1.0, 3.0]);
    }

    #[test]
    fn test_filter_stage_skips_bad_files() -> Result<()> {
        let dir = tempdir()?;
        let raw = dir.path().join("raw");
        fs::create_dir_all(&raw)?;
        fs::write(
            raw.join("a_2020.csv"),
            format!(
                "{}\"2020\";\"01\";\"0201\";\"160\";\"PR\";\"4118501\";\"10\";\"100\"\n\"2020\";\"01\";\"0201\";\"160\";\"SC\";\"4205407\";\"10\";\"100\"\n",
                HEADER
            ),
        )?;
        fs::write(raw.join("b_bad.csv"), "nothing useful here\n")?;
        fs::write(
            raw.join("c_2021.csv"),
            "CO_ANO,CO_MES,SH4,CO_PAIS,SG_UF_MUN,CO_MUN,KG_LIQUIDO,VL_FOB\n2021,3,1201,249,PR,4118501,5,70\n",
        )?;

        let sources = discover_sources(&raw, "*.csv")?;
        assert_eq!(sources.len(), 3);

        let out = dir.path().join("merged.tsv");
        let summary = run_filter_stage(&sources, 4118501, false, &out, &SilentObserver)?;
        assert_eq!(summary.files_parsed, 2);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.records_parsed, 3);
        assert_eq!(summary.records_matched, 2);
        assert_eq!(summary.records_per_year.get(&2021), Some(&1));

        let table = Table::read(&out)?;
        assert_eq!(table.headers[0], "CO_ANO");
        assert_eq!(table.rows[0][2], "201");
        assert_eq!(table.rows[1][0], "2021");
        Ok(())
    }

    #[test]
    fn test_no_match_writes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let src = dir.path().join("only.csv");
        fs::write(
            &src,
            format!("{}\"2020\";\"01\";\"0201\";\"160\";\"PR\";\"1\";\"10\";\"100\"\n", HEADER),
        )?;
        let out = dir.path().join("merged.tsv");
        let err = run_filter_stage(&[src], 4118501, false, &out, &SilentObserver).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoMatchingRecords { municipality: 4118501 })
        ));
        assert!(!out.exists());
        Ok(())
    }

    #[test]
    fn test_discover_treats_directory_literally() -> Result<()> {
        let dir = tempdir()?;
        let raw = dir.path().join("raw[2020]*");
        fs::create_dir_all(&raw)?;
        fs::write(raw.join("a.csv"), HEADER)?;
        fs::write(raw.join("b.txt"), HEADER)?;
        let sources = discover_sources(&raw, "*.csv")?;
        assert_eq!(sources, vec![raw.join("a.csv")]);
        Ok(())
    }

    #[test]
    fn test_discover_without_matches_is_error() -> Result<()> {
        let dir = tempdir()?;
        let err = discover_sources(dir.path(), "*.csv").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoSourceFiles { .. })
        ));
        Ok(())
    }
}
