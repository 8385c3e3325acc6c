// src/record.rs
use serde::Serialize;

use crate::parse::utils::{coerce_float, coerce_int, strip_quotes};
use crate::table::Table;

pub const CO_ANO: &str = "CO_ANO";
pub const CO_MES: &str = "CO_MES";
pub const SH4: &str = "SH4";
pub const CO_PAIS: &str = "CO_PAIS";
pub const SG_UF_MUN: &str = "SG_UF_MUN";
pub const CO_MUN: &str = "CO_MUN";
pub const KG_LIQUIDO: &str = "KG_LIQUIDO";
pub const VL_FOB: &str = "VL_FOB";

/// Canonical column order of a trade export.
pub const CANONICAL_COLUMNS: [&str; 8] = [
    CO_ANO, CO_MES, SH4, CO_PAIS, SG_UF_MUN, CO_MUN, KG_LIQUIDO, VL_FOB,
];

/// One import transaction. Every numeric field is `None` when its raw
/// value could not be read as a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub commodity_sh4: Option<i64>,
    pub country_code: Option<i64>,
    pub state_abbrev: String,
    pub municipality_code: Option<i64>,
    pub net_weight_kg: Option<f64>,
    pub fob_value: Option<f64>,
}

impl TradeRecord {
    /// Build a record from 8 raw fields in canonical order.
    ///
    /// Returns the record together with the number of non-empty fields that
    /// failed numeric coercion.
    pub fn from_fields<S: AsRef<str>>(fields: &[S; 8]) -> (Self, usize) {
        let mut failures = 0;
        let mut int = |raw: &str| {
            let v = coerce_int(raw);
            if v.is_none() && !strip_quotes(raw).trim().is_empty() {
                failures += 1;
            }
            v
        };
        let year = int(fields[0].as_ref());
        let month = int(fields[1].as_ref());
        let commodity_sh4 = int(fields[2].as_ref());
        let country_code = int(fields[3].as_ref());
        let municipality_code = int(fields[5].as_ref());

        let mut float = |raw: &str| {
            let v = coerce_float(raw);
            if v.is_none() && !strip_quotes(raw).trim().is_empty() {
                failures += 1;
            }
            v
        };
        let net_weight_kg = float(fields[6].as_ref());
        let fob_value = float(fields[7].as_ref());

        let record = Self {
            year,
            month,
            commodity_sh4,
            country_code,
            state_abbrev: strip_quotes(fields[4].as_ref()).trim().to_string(),
            municipality_code,
            net_weight_kg,
            fob_value,
        };
        (record, failures)
    }

    /// Render the record as 8 cells in canonical order; nulls become empty cells.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            fmt_opt(self.year),
            fmt_opt(self.month),
            fmt_opt(self.commodity_sh4),
            fmt_opt(self.country_code),
            self.state_abbrev.clone(),
            fmt_opt(self.municipality_code),
            fmt_opt(self.net_weight_kg),
            fmt_opt(self.fob_value),
        ]
    }
}

pub fn fmt_opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// Materialize records as a table with the canonical header.
pub fn records_to_table(records: &[TradeRecord]) -> Table {
    Table {
        headers: CANONICAL_COLUMNS.iter().map(|s| s.to_string()).collect(),
        rows: records.iter().map(TradeRecord::to_row).collect(),
    }
}
