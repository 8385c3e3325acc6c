use std::collections::HashMap;

use super::sort::SortKey;

/// Occurrence count per code. Null codes are never counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: HashMap<i64, usize>,
}

impl FrequencyTable {
    pub fn from_codes<I>(codes: I) -> Self
    where
        I: IntoIterator<Item = Option<i64>>,
    {
        let mut counts = HashMap::new();
        for code in codes.into_iter().flatten() {
            *counts.entry(code).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Frequency attached to a record carrying `code`; null stays null.
    pub fn get(&self, code: Option<i64>) -> Option<usize> {
        code.and_then(|c| self.counts.get(&c).copied())
    }

    /// Number of distinct codes.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The `n` most frequent codes, ties broken by ascending code.
    pub fn top(&self, n: usize) -> Vec<(i64, usize)> {
        let mut all: Vec<(i64, usize)> = self.counts.iter().map(|(&c, &n)| (c, n)).collect();
        all.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        all.truncate(n);
        all
    }
}

/// Commodity and country frequencies computed over the same record scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeFrequencies {
    pub commodity: FrequencyTable,
    pub country: FrequencyTable,
}

impl CodeFrequencies {
    pub fn over<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a SortKey>,
    {
        let keys: Vec<&SortKey> = keys.into_iter().collect();
        Self {
            commodity: FrequencyTable::from_codes(keys.iter().map(|k| k.commodity_sh4)),
            country: FrequencyTable::from_codes(keys.iter().map(|k| k.country_code)),
        }
    }
}
