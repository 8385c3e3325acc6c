// src/rank/mod.rs
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::parse::utils::{coerce_float, coerce_int};
use crate::record::{fmt_opt, CO_ANO, CO_PAIS, SH4, VL_FOB};
use crate::report::PipelineObserver;
use crate::table::{Table, COMMA};

pub mod frequency;
pub mod sort;

pub use frequency::{CodeFrequencies, FrequencyTable};
pub use sort::{
    rank, rank_global, rank_per_year, FrequencyScope, RankedRow, Ranking, SortKey,
    SortMode,
};

pub const FREQ_SH4: &str = "FREQ_SH4";
pub const FREQ_PAIS: &str = "FREQ_PAIS";
pub const FREQ_SH4_ANO: &str = "FREQ_SH4_ANO";
pub const FREQ_PAIS_ANO: &str = "FREQ_PAIS_ANO";

const TOP_CODES: usize = 5;

/// Names of the two frequency columns appended for `mode`.
pub fn frequency_columns(mode: SortMode) -> [&'static str; 2] {
    match mode {
        SortMode::Global => [FREQ_SH4, FREQ_PAIS],
        SortMode::PerYear => [FREQ_SH4_ANO, FREQ_PAIS_ANO],
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopeSummary {
    pub scope: FrequencyScope,
    pub rows: usize,
    pub top_commodities: Vec<(i64, usize)>,
    pub top_countries: Vec<(i64, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SortSummary {
    pub mode: SortMode,
    pub rows: usize,
    pub years: Vec<i64>,
    pub scopes: Vec<ScopeSummary>,
}

/// Sort keys read from the four required columns; cells that are not
/// numbers become nulls.
fn sort_keys(table: &Table) -> Result<Vec<SortKey>> {
    let year = table.require_column(CO_ANO)?;
    let sh4 = table.require_column(SH4)?;
    let pais = table.require_column(CO_PAIS)?;
    let fob = table.require_column(VL_FOB)?;

    fn cell(row: &[String], i: usize) -> &str {
        row.get(i).map(String::as_str).unwrap_or("")
    }
    Ok(table
        .rows
        .iter()
        .map(|row| SortKey {
            year: coerce_int(cell(row, year)),
            commodity_sh4: coerce_int(cell(row, sh4)),
            country_code: coerce_int(cell(row, pais)),
            fob_value: coerce_float(cell(row, fob)),
        })
        .collect())
}

/// Reorder every row of `table` by `mode`. All input columns are kept (minus
/// stale frequency columns of the same mode) and the two frequency columns
/// are appended.
pub fn sort_table(table: &Table, mode: SortMode) -> Result<(Table, SortSummary)> {
    let keys = sort_keys(table)?;
    let (sorted, ranking) = reorder(table, &keys, mode);
    Ok((sorted, summarize(&ranking, &keys)))
}

fn reorder(table: &Table, keys: &[SortKey], mode: SortMode) -> (Table, Ranking) {
    let ranking = rank(keys, mode);

    let freq_cols = frequency_columns(mode);
    let kept: Vec<usize> = (0..table.headers.len())
        .filter(|&i| !freq_cols.contains(&table.headers[i].as_str()))
        .collect();

    let mut headers: Vec<String> = kept.iter().map(|&i| table.headers[i].clone()).collect();
    headers.extend(freq_cols.iter().map(|s| s.to_string()));

    let rows = ranking
        .order
        .iter()
        .map(|r| {
            let src = &table.rows[r.index];
            let mut row: Vec<String> = kept
                .iter()
                .map(|&i| src.get(i).cloned().unwrap_or_default())
                .collect();
            row.push(fmt_opt(r.freq_commodity));
            row.push(fmt_opt(r.freq_country));
            row
        })
        .collect();

    (Table { headers, rows }, ranking)
}

fn summarize(ranking: &Ranking, keys: &[SortKey]) -> SortSummary {
    let mut years: Vec<i64> = keys.iter().filter_map(|k| k.year).collect();
    years.sort_unstable();
    years.dedup();

    SortSummary {
        mode: ranking.mode,
        rows: ranking.order.len(),
        years,
        scopes: ranking
            .scopes
            .iter()
            .map(|s| ScopeSummary {
                scope: s.scope,
                rows: s.rows,
                top_commodities: s.frequencies.commodity.top(TOP_CODES),
                top_countries: s.frequencies.country.top(TOP_CODES),
            })
            .collect(),
    }
}

/// Sort stage: read the merged artifact, rank it, write the sorted artifact
/// as comma-separated text.
#[tracing::instrument(level = "info", skip(input, output, observer), fields(input = %input.as_ref().display()))]
pub fn run_sort_stage<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    mode: SortMode,
    observer: &dyn PipelineObserver,
) -> Result<SortSummary> {
    let input = input.as_ref();
    let output = output.as_ref();

    let table = Table::read(input).context("reading merged dataset")?;
    info!(rows = table.len(), "loaded merged dataset");
    if table.is_empty() {
        warn!(path = %input.display(), "merged dataset has no rows");
    }

    let (sorted, summary) = sort_table(&table, mode)?;
    sorted
        .write(output, COMMA)
        .with_context(|| format!("writing sorted dataset {}", output.display()))?;

    observer.sorted(output, &summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::report::SilentObserver;
    use crate::table::TAB;
    use anyhow::Result;
    use tempfile::tempdir;

    fn merged() -> Table {
        let h = ["CO_ANO", "CO_MES", "SH4", "CO_PAIS", "SG_UF_MUN", "CO_MUN", "KG_LIQUIDO", "VL_FOB"];
        let rows = [
            ["2020", "1", "100", "76", "PR", "4118501", "1", "50"],
            ["2020", "2", "100", "76", "PR", "4118501", "1", "80"],
            ["2020", "3", "200", "76", "PR", "4118501", "1", "200"],
        ];
        Table {
            headers: h.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_sort_table_appends_frequency_columns() -> Result<()> {
        let (sorted, summary) = sort_table(&merged(), SortMode::Global)?;
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.years, vec![2020]);
        assert_eq!(summary.scopes[0].top_commodities, vec![(100, 2), (200, 1)]);
        assert_eq!(sorted.headers.len(), 10);
        assert_eq!(sorted.headers[8], FREQ_SH4);
        assert_eq!(sorted.headers[9], FREQ_PAIS);
        let fobs: Vec<&str> = sorted.rows.iter().map(|r| r[7].as_str()).collect();
        assert_eq!(fobs, vec!["80", "50", "200"]);
        assert_eq!(sorted.rows[0][8], "2");
        assert_eq!(sorted.rows[2][8], "1");
        assert_eq!(sorted.rows[0][9], "3");
        Ok(())
    }

    #[test]
    fn test_resorting_replaces_stale_frequency_columns() -> Result<()> {
        let (once, _) = sort_table(&merged(), SortMode::Global)?;
        let (twice, _) = sort_table(&once, SortMode::Global)?;
        assert_eq!(once, twice);
        Ok(())
    }

    #[test]
    fn test_missing_required_column() {
        let mut table = merged();
        table.headers[3] = "PAIS".into();
        let err = sort_table(&table, SortMode::Global).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingColumn { column, .. }) if column == "CO_PAIS"
        ));
    }

    #[test]
    fn test_short_rows_read_as_blank_cells() -> Result<()> {
        let mut table = merged();
        table.rows.push(vec!["2020".into(), "4".into(), "200".into()]);
        let (sorted, _) = sort_table(&table, SortMode::Global)?;
        let last = sorted.rows.last().expect("row");
        assert_eq!(last[2], "200");
        assert_eq!(last[3], "");
        assert_eq!(last[8], "2");
        assert_eq!(last[9], "");
        Ok(())
    }

    #[test]
    fn test_run_sort_stage_per_year() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("merged.tsv");
        let output = dir.path().join("sorted.csv");
        merged().write(&input, TAB)?;

        let summary = run_sort_stage(&input, &output, SortMode::PerYear, &SilentObserver)?;
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.years, vec![2020]);
        assert_eq!(summary.scopes[0].top_commodities[0], (100, 2));

        let written = Table::read(&output)?;
        assert_eq!(written.headers[8], FREQ_SH4_ANO);
        assert_eq!(written.len(), 3);
        Ok(())
    }
}
