// src/report.rs
use std::path::Path;
use tracing::{info, warn};

use crate::merge::MergeSummary;
use crate::parse::{FileShape, ParseStats};
use crate::rank::{FrequencyScope, SortSummary};
use crate::translate::{DictionarySummary, JoinStats, TranslationSummary};

/// Receives progress and diagnostics from the pipeline stages.
///
/// Every method has an empty default, so an observer only implements what it
/// cares about.
pub trait PipelineObserver {
    fn source_parsed(&self, _source: &Path, _shape: FileShape, _stats: &ParseStats, _matched: usize) {}
    fn source_skipped(&self, _source: &Path, _error: &anyhow::Error) {}
    fn merged(&self, _output: &Path, _summary: &MergeSummary) {}
    fn sorted(&self, _output: &Path, _summary: &SortSummary) {}
    fn dictionary_loaded(&self, _source: &Path, _summary: &DictionarySummary) {}
    fn translated(&self, _output: &Path, _summary: &TranslationSummary) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl PipelineObserver for SilentObserver {}

/// Turns pipeline events into `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

fn scope_label(scope: FrequencyScope) -> String {
    match scope {
        FrequencyScope::All => "all years".to_string(),
        FrequencyScope::Year(y) => y.to_string(),
        FrequencyScope::UnknownYear => "unknown year".to_string(),
    }
}

fn log_join(what: &str, stats: &JoinStats, rows: usize) {
    info!(
        "{} translated: {}/{} ({:.1}%)",
        what,
        stats.matched,
        rows,
        stats.matched_pct()
    );
    if stats.unmatched > 0 {
        warn!(
            unmatched = stats.unmatched,
            distinct = stats.distinct_missing,
            sample = ?stats.missing_sample,
            "{} codes missing from dictionary",
            what
        );
    }
}

impl PipelineObserver for TracingObserver {
    fn source_parsed(&self, source: &Path, shape: FileShape, stats: &ParseStats, matched: usize) {
        info!(
            file = %source.display(),
            %shape,
            lines = stats.data_lines,
            accepted = stats.accepted,
            skipped = stats.skipped_lines,
            coercion_failures = stats.coercion_failures,
            matched,
            "parsed source"
        );
    }

    fn source_skipped(&self, source: &Path, error: &anyhow::Error) {
        warn!(file = %source.display(), "skipping source: {:#}", error);
    }

    fn merged(&self, output: &Path, summary: &MergeSummary) {
        info!(
            path = %output.display(),
            municipality = summary.municipality,
            files = summary.files_found,
            skipped = summary.files_skipped,
            records = summary.records_matched,
            "merged dataset written"
        );
        for (year, count) in &summary.records_per_year {
            info!("   {}: {} records", year, count);
        }
        if summary.records_without_year > 0 {
            info!("   unknown year: {} records", summary.records_without_year);
        }
    }

    fn sorted(&self, output: &Path, summary: &SortSummary) {
        info!(
            path = %output.display(),
            mode = ?summary.mode,
            rows = summary.rows,
            years = ?summary.years,
            "sorted dataset written"
        );
        for scope in &summary.scopes {
            info!(
                scope = %scope_label(scope.scope),
                rows = scope.rows,
                top_sh4 = ?scope.top_commodities,
                top_countries = ?scope.top_countries,
                "most frequent codes"
            );
        }
    }

    fn dictionary_loaded(&self, source: &Path, summary: &DictionarySummary) {
        info!(
            file = %source.display(),
            dictionary = ?summary.kind,
            entries = summary.entries,
            "mapping {} → code, {} → label",
            summary.code_column,
            summary.label_column
        );
        if summary.unusable_rows > 0 {
            warn!(rows = summary.unusable_rows, "dictionary rows without a numeric code or label");
        }
    }

    fn translated(&self, output: &Path, summary: &TranslationSummary) {
        info!(path = %output.display(), rows = summary.rows, "translated dataset written");
        log_join("SH4", &summary.commodity, summary.rows);
        log_join("country", &summary.country, summary.rows);
    }
}
