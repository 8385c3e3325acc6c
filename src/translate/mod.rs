// src/translate/mod.rs
use anyhow::{Context, Result};
use serde::Serialize;
use std::{collections::HashSet, path::Path};
use tracing::{info, warn};

use crate::parse::utils::coerce_int;
use crate::record::fmt_opt;
use crate::report::PipelineObserver;
use crate::table::{Table, COMMA};

pub mod dictionary;
pub mod resolve;

pub use dictionary::{Dictionary, DictionaryKind, DictionarySummary, NO_PAIS, NO_SH4_POR};
pub use resolve::{resolve_column, ColumnResolution, ColumnRule};

/// Join outcome for one dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinStats {
    pub matched: usize,
    pub unmatched: usize,
    /// Number of distinct codes without a label.
    pub distinct_missing: usize,
    /// Distinct codes without a label, in first-seen order, up to the
    /// configured sample size. `None` is a blank code.
    pub missing_sample: Vec<Option<i64>>,
}

impl JoinStats {
    pub fn matched_pct(&self) -> f64 {
        let total = self.matched + self.unmatched;
        if total == 0 {
            0.0
        } else {
            self.matched as f64 * 100.0 / total as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranslationSummary {
    pub rows: usize,
    pub commodity: JoinStats,
    pub country: JoinStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Input(usize),
    /// Coerced code of the column at this index.
    Code(usize),
    Label(DictionaryKind),
}

/// Column plan for the output: input order, label right after its code
/// column. Label columns already present in the input are dropped so a
/// second translation replaces them in place.
fn plan_columns(headers: &[String], sh4: usize, pais: usize) -> Vec<(String, Cell)> {
    let mut plan = Vec::with_capacity(headers.len() + 2);
    for (i, name) in headers.iter().enumerate() {
        if name == NO_SH4_POR || name == NO_PAIS {
            continue;
        }
        if i == sh4 {
            plan.push((name.clone(), Cell::Code(i)));
            plan.push((NO_SH4_POR.to_string(), Cell::Label(DictionaryKind::Commodity)));
        } else if i == pais {
            plan.push((name.clone(), Cell::Code(i)));
            plan.push((NO_PAIS.to_string(), Cell::Label(DictionaryKind::Country)));
        } else {
            plan.push((name.clone(), Cell::Input(i)));
        }
    }
    plan
}

struct JoinTracker {
    stats: JoinStats,
    missing: HashSet<Option<i64>>,
    sample_size: usize,
}

impl JoinTracker {
    fn new(sample_size: usize) -> Self {
        Self {
            stats: JoinStats::default(),
            missing: HashSet::new(),
            sample_size,
        }
    }

    fn observe(&mut self, code: Option<i64>, label: Option<&str>) {
        if label.is_some() {
            self.stats.matched += 1;
            return;
        }
        self.stats.unmatched += 1;
        if self.missing.insert(code) {
            self.stats.distinct_missing += 1;
            if self.stats.missing_sample.len() < self.sample_size {
                self.stats.missing_sample.push(code);
            }
        }
    }
}

/// Left-join `SH4` and `CO_PAIS` against the dictionaries.
///
/// Every input row yields exactly one output row. Code columns are written
/// back in their numeric form (blank when unreadable); a missing label is a
/// blank cell.
pub fn translate_table(
    table: &Table,
    commodities: &Dictionary,
    countries: &Dictionary,
    sample_size: usize,
) -> Result<(Table, TranslationSummary)> {
    let sh4 = table.require_column(DictionaryKind::Commodity.code_column())?;
    let pais = table.require_column(DictionaryKind::Country.code_column())?;
    let plan = plan_columns(&table.headers, sh4, pais);

    let mut commodity = JoinTracker::new(sample_size);
    let mut country = JoinTracker::new(sample_size);

    fn cell(row: &[String], i: usize) -> &str {
        row.get(i).map(String::as_str).unwrap_or("")
    }
    let mut rows = Vec::with_capacity(table.len());
    for row in &table.rows {
        let sh4_code = coerce_int(cell(row, sh4));
        let pais_code = coerce_int(cell(row, pais));
        let sh4_label = commodities.label(sh4_code);
        let pais_label = countries.label(pais_code);
        commodity.observe(sh4_code, sh4_label);
        country.observe(pais_code, pais_label);

        let out: Vec<String> = plan
            .iter()
            .map(|(_, c)| match *c {
                Cell::Input(i) => cell(row, i).to_string(),
                Cell::Code(i) => fmt_opt(coerce_int(cell(row, i))),
                Cell::Label(DictionaryKind::Commodity) => sh4_label.unwrap_or("").to_string(),
                Cell::Label(DictionaryKind::Country) => pais_label.unwrap_or("").to_string(),
            })
            .collect();
        rows.push(out);
    }

    let headers = plan.into_iter().map(|(name, _)| name).collect();
    let summary = TranslationSummary {
        rows: rows.len(),
        commodity: commodity.stats,
        country: country.stats,
    };
    Ok((Table { headers, rows }, summary))
}

/// Paths for the translation stage.
#[derive(Debug, Clone)]
pub struct TranslateInputs<'a> {
    pub dataset: &'a Path,
    pub commodity_dictionary: &'a Path,
    pub country_dictionary: &'a Path,
}

/// Translation stage: load both dictionaries and the sorted dataset, join,
/// and write the labeled dataset as comma-separated text.
#[tracing::instrument(level = "info", skip(inputs, output, observer), fields(input = %inputs.dataset.display()))]
pub fn run_translate_stage<P: AsRef<Path>>(
    inputs: &TranslateInputs<'_>,
    output: P,
    sample_size: usize,
    observer: &dyn PipelineObserver,
) -> Result<TranslationSummary> {
    let output = output.as_ref();

    let commodities = Dictionary::load(inputs.commodity_dictionary, DictionaryKind::Commodity)
        .context("loading commodity dictionary")?;
    observer.dictionary_loaded(inputs.commodity_dictionary, commodities.summary());
    let countries = Dictionary::load(inputs.country_dictionary, DictionaryKind::Country)
        .context("loading country dictionary")?;
    observer.dictionary_loaded(inputs.country_dictionary, countries.summary());

    let table = Table::read(inputs.dataset).context("reading sorted dataset")?;
    info!(rows = table.len(), "loaded sorted dataset");
    if table.is_empty() {
        warn!(path = %inputs.dataset.display(), "sorted dataset has no rows");
    }

    let (translated, summary) = translate_table(&table, &commodities, &countries, sample_size)?;
    translated
        .write(output, COMMA)
        .with_context(|| format!("writing translated dataset {}", output.display()))?;

    observer.translated(output, &summary);
    Ok(summary)
}
