use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::frequency::CodeFrequencies;

/// The four values the hierarchical order looks at.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SortKey {
    pub year: Option<i64>,
    pub commodity_sh4: Option<i64>,
    pub country_code: Option<i64>,
    pub fob_value: Option<f64>,
}

/// Where frequencies are counted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// One frequency table over the whole dataset; order by year first.
    #[default]
    Global,
    /// Frequencies counted inside each year; years concatenated ascending.
    PerYear,
}

/// Scope a set of frequencies was computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrequencyScope {
    All,
    Year(i64),
    UnknownYear,
}

#[derive(Debug, Clone)]
pub struct ScopedFrequencies {
    pub scope: FrequencyScope,
    pub rows: usize,
    pub frequencies: CodeFrequencies,
}

/// Position of an input row in the output, with the frequencies attached to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedRow {
    /// Index into the input slice.
    pub index: usize,
    pub freq_commodity: Option<usize>,
    pub freq_country: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Ranking {
    pub mode: SortMode,
    pub order: Vec<RankedRow>,
    pub scopes: Vec<ScopedFrequencies>,
}

fn asc_nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn desc_nulls_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(&b, &a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// freq_commodity desc, freq_country desc, fob desc. Nulls sort last.
fn by_frequency_then_fob(a: &RankedRow, b: &RankedRow, keys: &[SortKey]) -> Ordering {
    desc_nulls_last(a.freq_commodity, b.freq_commodity, Ord::cmp)
        .then_with(|| desc_nulls_last(a.freq_country, b.freq_country, Ord::cmp))
        .then_with(|| {
            desc_nulls_last(keys[a.index].fob_value, keys[b.index].fob_value, f64::total_cmp)
        })
}

fn attach(indices: impl IntoIterator<Item = usize>, keys: &[SortKey], f: &CodeFrequencies) -> Vec<RankedRow> {
    indices
        .into_iter()
        .map(|index| RankedRow {
            index,
            freq_commodity: f.commodity.get(keys[index].commodity_sh4),
            freq_country: f.country.get(keys[index].country_code),
        })
        .collect()
}

/// Frequencies over the whole set; order by year asc, then frequencies and
/// FOB descending. The sort is stable.
pub fn rank_global(keys: &[SortKey]) -> Ranking {
    let frequencies = CodeFrequencies::over(keys);
    let mut order = attach(0..keys.len(), keys, &frequencies);
    order.sort_by(|a, b| {
        asc_nulls_last(keys[a.index].year, keys[b.index].year)
            .then_with(|| by_frequency_then_fob(a, b, keys))
    });
    Ranking {
        mode: SortMode::Global,
        order,
        scopes: vec![ScopedFrequencies {
            scope: FrequencyScope::All,
            rows: keys.len(),
            frequencies,
        }],
    }
}

/// Split row indices by year, keeping input order inside each year.
/// Years ascend; rows without a year form the last partition.
pub fn partition_by_year(keys: &[SortKey]) -> Vec<(FrequencyScope, Vec<usize>)> {
    let mut years: Vec<Option<i64>> = keys.iter().map(|k| k.year).collect();
    years.sort_by(|a, b| asc_nulls_last(*a, *b));
    years.dedup();

    years
        .into_iter()
        .map(|year| {
            let scope = match year {
                Some(y) => FrequencyScope::Year(y),
                None => FrequencyScope::UnknownYear,
            };
            let members = (0..keys.len()).filter(|&i| keys[i].year == year).collect();
            (scope, members)
        })
        .collect()
}

/// Frequencies counted inside each year only; each year sorted on its own
/// and the years concatenated in ascending order.
pub fn rank_per_year(keys: &[SortKey]) -> Ranking {
    let mut order = Vec::with_capacity(keys.len());
    let mut scopes = Vec::new();

    for (scope, members) in partition_by_year(keys) {
        let frequencies = CodeFrequencies::over(members.iter().map(|&i| &keys[i]));
        let mut rows = attach(members.iter().copied(), keys, &frequencies);
        rows.sort_by(|a, b| by_frequency_then_fob(a, b, keys));
        order.extend(rows);
        scopes.push(ScopedFrequencies {
            scope,
            rows: members.len(),
            frequencies,
        });
    }

    Ranking {
        mode: SortMode::PerYear,
        order,
        scopes,
    }
}

pub fn rank(keys: &[SortKey], mode: SortMode) -> Ranking {
    match mode {
        SortMode::Global => rank_global(keys),
        SortMode::PerYear => rank_per_year(keys),
    }
}
