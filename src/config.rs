// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path, path::PathBuf};

use crate::rank::SortMode;

pub const DEFAULT_MUNICIPALITY: i64 = 4118501;
pub const DEFAULT_MISSING_SAMPLE: usize = 10;

/// Paths and knobs for a full run. Every field has a default, so a YAML
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory holding the raw exports.
    pub input_dir: PathBuf,
    /// Glob pattern for raw exports inside `input_dir`.
    pub pattern: String,
    pub municipality: i64,
    /// Order the merged dataset by (CO_ANO, CO_MES).
    pub chronological: bool,
    pub merged_path: PathBuf,
    pub sort_mode: SortMode,
    pub sorted_path: PathBuf,
    /// When set, the other sort mode is also written here.
    pub alternate_sorted_path: Option<PathBuf>,
    pub commodity_dictionary: PathBuf,
    pub country_dictionary: PathBuf,
    pub translated_path: PathBuf,
    /// How many missing codes to list per dictionary.
    pub missing_sample: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("Bruto"),
            pattern: "*.csv".to_string(),
            municipality: DEFAULT_MUNICIPALITY,
            chronological: false,
            merged_path: PathBuf::from("dados_import_filtrados.tsv"),
            sort_mode: SortMode::Global,
            sorted_path: PathBuf::from("dados_ordenados_hierarquico.csv"),
            alternate_sorted_path: None,
            commodity_dictionary: PathBuf::from("dicionario_sh4.csv"),
            country_dictionary: PathBuf::from("dicionario_pais.csv"),
            translated_path: PathBuf::from("dados_ordenados_hierarquicos_traduzidos.csv"),
            missing_sample: DEFAULT_MISSING_SAMPLE,
        }
    }
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening config {}", path.display()))?;
        serde_yaml::from_reader(file).with_context(|| format!("parsing config {}", path.display()))
    }

    /// `load` when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
