// src/pipeline.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fs::File, io::BufWriter, path::Path};
use tracing::info;

use crate::config::PipelineConfig;
use crate::merge::{discover_sources, run_filter_stage, MergeSummary};
use crate::rank::{run_sort_stage, SortMode, SortSummary};
use crate::report::PipelineObserver;
use crate::translate::{run_translate_stage, TranslateInputs, TranslationSummary};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub merge: MergeSummary,
    pub sort: SortSummary,
    pub alternate_sort: Option<SortSummary>,
    pub translation: TranslationSummary,
}

impl RunSummary {
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("creating summary {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("writing summary {}", path.display()))
    }
}

/// Run filter → sort → translate. The first stage that fails stops the run.
pub fn run_pipeline(config: &PipelineConfig, observer: &dyn PipelineObserver) -> Result<RunSummary> {
    let started_at = Utc::now();

    // ─── 1) filter + merge ───────────────────────────────────────────
    let sources = discover_sources(&config.input_dir, &config.pattern)?;
    info!("found {} source files", sources.len());
    let merge = run_filter_stage(
        &sources,
        config.municipality,
        config.chronological,
        &config.merged_path,
        observer,
    )
    .context("filter stage")?;

    // ─── 2) hierarchical sort ────────────────────────────────────────
    let sort = run_sort_stage(&config.merged_path, &config.sorted_path, config.sort_mode, observer)
        .context("sort stage")?;
    let alternate_sort = match &config.alternate_sorted_path {
        Some(path) => {
            let other = match config.sort_mode {
                SortMode::Global => SortMode::PerYear,
                SortMode::PerYear => SortMode::Global,
            };
            Some(
                run_sort_stage(&config.merged_path, path, other, observer)
                    .context("alternate sort stage")?,
            )
        }
        None => None,
    };

    // ─── 3) translate ────────────────────────────────────────────────
    let inputs = TranslateInputs {
        dataset: &config.sorted_path,
        commodity_dictionary: &config.commodity_dictionary,
        country_dictionary: &config.country_dictionary,
    };
    let translation =
        run_translate_stage(&inputs, &config.translated_path, config.missing_sample, observer)
            .context("translate stage")?;

    Ok(RunSummary {
        started_at,
        finished_at: Utc::now(),
        merge,
        sort,
        alternate_sort,
        translation,
    })
}
