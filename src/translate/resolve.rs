/// Which markers identify a dictionary column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub role: &'static str,
    pub markers: &'static [&'static str],
}

pub const COMMODITY_CODE: ColumnRule = ColumnRule {
    role: "code",
    markers: &["SH4"],
};

pub const COMMODITY_LABEL: ColumnRule = ColumnRule {
    role: "label",
    markers: &["NOME", "DESCRIÇÃO", "DESCRICAO", "NO_SH4_POR"],
};

pub const COUNTRY_CODE: ColumnRule = ColumnRule {
    role: "code",
    markers: &["CO_PAIS", "COD_PAIS", "PAIS"],
};

pub const COUNTRY_LABEL: ColumnRule = ColumnRule {
    role: "label",
    markers: &["NOME", "NO_PAIS", "NOME_PAIS"],
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnResolution {
    Found {
        index: usize,
        name: String,
        /// Other columns that also carried a marker.
        alternatives: Vec<String>,
    },
    NotFound,
}

impl ColumnResolution {
    pub fn index(&self) -> Option<usize> {
        match self {
            ColumnResolution::Found { index, .. } => Some(*index),
            ColumnResolution::NotFound => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, ColumnResolution::Found { alternatives, .. } if !alternatives.is_empty())
    }
}

/// Find the column for `rule` among `headers`, ignoring indices in `exclude`.
///
/// Headers are compared case-insensitively by substring. The leftmost column
/// carrying any marker wins; every later match is listed as an alternative.
pub fn resolve_column(headers: &[String], rule: &ColumnRule, exclude: &[usize]) -> ColumnResolution {
    let mut candidates = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| !exclude.contains(i))
        .filter(|(_, h)| {
            let upper = h.trim().to_uppercase();
            rule.markers.iter().any(|m| upper.contains(m))
        })
        .map(|(i, _)| i);

    match candidates.next() {
        Some(index) => ColumnResolution::Found {
            index,
            name: headers[index].clone(),
            alternatives: candidates.map(|i| headers[i].clone()).collect(),
        },
        None => ColumnResolution::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_match() {
        let headers = h(&["CO_SH4", "NO_SH4_POR"]);
        let code = resolve_column(&headers, &COMMODITY_CODE, &[]);
        assert_eq!(code.index(), Some(0));
        assert!(code.is_ambiguous());

        let label = resolve_column(&headers, &COMMODITY_LABEL, &[0]);
        assert_eq!(
            label,
            ColumnResolution::Found {
                index: 1,
                name: "NO_SH4_POR".into(),
                alternatives: vec![],
            }
        );
    }

    #[test]
    fn test_case_insensitive_and_accented() {
        let headers = h(&["codigo_sh4", "Descrição"]);
        assert_eq!(resolve_column(&headers, &COMMODITY_CODE, &[]).index(), Some(0));
        assert_eq!(resolve_column(&headers, &COMMODITY_LABEL, &[0]).index(), Some(1));
    }

    #[test]
    fn test_leftmost_match_wins() {
        let headers = h(&["DESCRICAO", "NOME"]);
        let label = resolve_column(&headers, &COMMODITY_LABEL, &[]);
        assert_eq!(
            label,
            ColumnResolution::Found {
                index: 0,
                name: "DESCRICAO".into(),
                alternatives: vec!["NOME".into()],
            }
        );
        assert!(label.is_ambiguous());

        let headers = h(&["NO_PAIS", "CO_PAIS"]);
        let code = resolve_column(&headers, &COUNTRY_CODE, &[]);
        assert_eq!(code.index(), Some(0));
        assert!(code.is_ambiguous());
        assert_eq!(resolve_column(&headers, &COUNTRY_LABEL, &[0]), ColumnResolution::NotFound);
    }

    #[test]
    fn test_not_found() {
        let headers = h(&["ID", "LABEL"]);
        assert_eq!(resolve_column(&headers, &COUNTRY_CODE, &[]), ColumnResolution::NotFound);
        assert_eq!(resolve_column(&headers, &COMMODITY_LABEL, &[]), ColumnResolution::NotFound);
    }

    #[test]
    fn test_excluded_column_is_skipped() {
        let headers = h(&["NOME_PAIS"]);
        assert_eq!(resolve_column(&headers, &COUNTRY_LABEL, &[0]), ColumnResolution::NotFound);
    }
}
