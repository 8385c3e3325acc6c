// src/translate/dictionary.rs
use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    collections::{HashMap, HashSet},
    path::Path,
};
use tracing::warn;

use super::resolve::{
    resolve_column, ColumnResolution, ColumnRule, COMMODITY_CODE, COMMODITY_LABEL, COUNTRY_CODE,
    COUNTRY_LABEL,
};
use crate::error::PipelineError;
use crate::parse::utils::coerce_int;
use crate::record::{CO_PAIS, SH4};
use crate::table::{Table, COMMA};

pub const NO_SH4_POR: &str = "NO_SH4_POR";
pub const NO_PAIS: &str = "NO_PAIS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DictionaryKind {
    Commodity,
    Country,
}

impl DictionaryKind {
    pub fn name(self) -> &'static str {
        match self {
            DictionaryKind::Commodity => "commodity",
            DictionaryKind::Country => "country",
        }
    }

    /// Code column this dictionary joins on in the dataset.
    pub fn code_column(self) -> &'static str {
        match self {
            DictionaryKind::Commodity => SH4,
            DictionaryKind::Country => CO_PAIS,
        }
    }

    /// Label column the join adds to the dataset.
    pub fn label_column(self) -> &'static str {
        match self {
            DictionaryKind::Commodity => NO_SH4_POR,
            DictionaryKind::Country => NO_PAIS,
        }
    }

    fn rules(self) -> (ColumnRule, ColumnRule) {
        match self {
            DictionaryKind::Commodity => (COMMODITY_CODE, COMMODITY_LABEL),
            DictionaryKind::Country => (COUNTRY_CODE, COUNTRY_LABEL),
        }
    }
}

/// How a reference table was mapped onto `code → label`.
#[derive(Debug, Clone, Serialize)]
pub struct DictionarySummary {
    pub kind: DictionaryKind,
    pub source_rows: usize,
    pub entries: usize,
    pub code_column: String,
    pub label_column: String,
    pub ambiguous_code_columns: Vec<String>,
    pub ambiguous_label_columns: Vec<String>,
    /// Codes that appeared with more than one label; the first label wins.
    pub conflicting_codes: Vec<i64>,
    /// Rows whose code was not a number or whose label was empty.
    pub unusable_rows: usize,
}

#[derive(Debug, Clone)]
pub struct Dictionary {
    entries: HashMap<i64, String>,
    summary: DictionarySummary,
}

fn resolve(
    table: &Table,
    kind: DictionaryKind,
    rule: &ColumnRule,
    exclude: &[usize],
) -> Result<(usize, String, Vec<String>), PipelineError> {
    match resolve_column(&table.headers, rule, exclude) {
        ColumnResolution::Found {
            index,
            name,
            alternatives,
        } => {
            if !alternatives.is_empty() {
                warn!(
                    dictionary = kind.name(),
                    role = rule.role,
                    chosen = %name,
                    ?alternatives,
                    "ambiguous dictionary column"
                );
            }
            Ok((index, name, alternatives))
        }
        ColumnResolution::NotFound => Err(PipelineError::DictionaryColumnNotFound {
            dictionary: kind.name(),
            role: rule.role,
            markers: rule.markers.iter().map(|m| m.to_string()).collect(),
            available: table.headers.clone(),
        }),
    }
}

impl Dictionary {
    /// Normalize a raw reference table into `code → label`.
    ///
    /// Rows are deduplicated by (code, label). A code seen again with a
    /// different label keeps its first label, so a join never multiplies rows.
    pub fn from_table(table: &Table, kind: DictionaryKind) -> Result<Self> {
        let (code_rule, label_rule) = kind.rules();
        let (code_idx, code_column, ambiguous_code_columns) = resolve(table, kind, &code_rule, &[])?;
        let (label_idx, label_column, ambiguous_label_columns) =
            resolve(table, kind, &label_rule, &[code_idx])?;

        let mut entries: HashMap<i64, String> = HashMap::new();
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut conflicting_codes = Vec::new();
        let mut unusable_rows = 0;

        for row in &table.rows {
            let raw_code = row.get(code_idx).map(String::as_str).unwrap_or("");
            let label = row.get(label_idx).map(String::as_str).unwrap_or("");
            if !seen.insert((raw_code, label)) {
                continue;
            }
            let code = match coerce_int(raw_code) {
                Some(c) if !label.trim().is_empty() => c,
                _ => {
                    unusable_rows += 1;
                    continue;
                }
            };
            match entries.get(&code) {
                None => {
                    entries.insert(code, label.to_string());
                }
                Some(existing) if existing != label => {
                    if !conflicting_codes.contains(&code) {
                        conflicting_codes.push(code);
                    }
                }
                Some(_) => {}
            }
        }

        if !conflicting_codes.is_empty() {
            warn!(
                dictionary = kind.name(),
                count = conflicting_codes.len(),
                "codes with several labels; keeping the first label"
            );
        }

        let summary = DictionarySummary {
            kind,
            source_rows: table.len(),
            entries: entries.len(),
            code_column,
            label_column,
            ambiguous_code_columns,
            ambiguous_label_columns,
            conflicting_codes,
            unusable_rows,
        };
        Ok(Self { entries, summary })
    }

    /// Load a comma-separated reference table from disk.
    pub fn load<P: AsRef<Path>>(path: P, kind: DictionaryKind) -> Result<Self> {
        let path = path.as_ref();
        let text = crate::parse::read_source(path)?;
        let table = Table::parse(&text, COMMA)
            .with_context(|| format!("parsing {} dictionary {}", kind.name(), path.display()))?;
        Self::from_table(&table, kind)
            .with_context(|| format!("mapping {} dictionary {}", kind.name(), path.display()))
    }

    pub fn kind(&self) -> DictionaryKind {
        self.summary.kind
    }

    pub fn summary(&self) -> &DictionarySummary {
        &self.summary
    }

    pub fn label(&self, code: Option<i64>) -> Option<&str> {
        code.and_then(|c| self.entries.get(&c)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
