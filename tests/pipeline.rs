use anyhow::Result;
use std::{fs, path::Path};
use tempfile::tempdir;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tradeflow::{
    config::PipelineConfig,
    pipeline::run_pipeline,
    rank::SortMode,
    PipelineError, SilentObserver, Table,
};

const RAW_HEADER: &str =
    "\"CO_ANO\";\"CO_MES\";\"SH4\";\"CO_PAIS\";\"SG_UF_MUN\";\"CO_MUN\";\"KG_LIQUIDO\";\"VL_FOB\"\n";

fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tradeflow=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn write_dictionaries(dir: &Path) -> Result<()> {
    fs::write(
        dir.join("sh4.csv"),
        "CO_SH4,NO_SH4_POR,NO_SH4_ING\n100,Cavalos,Horses\n200,Soja,Soybeans\n300,Milho,Maize\n",
    )?;
    fs::write(
        dir.join("pais.csv"),
        "CO_PAIS,CO_PAIS_ISOA3,NO_PAIS,NO_PAIS_ING\n76,BRA,Brasil,Brazil\n160,CHN,China,China\n",
    )?;
    Ok(())
}

fn config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        input_dir: dir.join("raw"),
        merged_path: dir.join("out/merged.tsv"),
        sorted_path: dir.join("out/sorted.csv"),
        commodity_dictionary: dir.join("sh4.csv"),
        country_dictionary: dir.join("pais.csv"),
        translated_path: dir.join("out/final.csv"),
        ..PipelineConfig::default()
    }
}

#[test]
fn mixed_sources_per_year_ranking() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    let raw = dir.path().join("raw");
    fs::create_dir_all(&raw)?;

    // Raw export, Latin-1 encoded.
    let mut latin1 = RAW_HEADER.as_bytes().to_vec();
    latin1.extend_from_slice(b"\"2021\";\"01\";\"0300\";\"160\";\"S\xe3\";\"4118501\";\"5\";\"10\"\n");
    latin1.extend_from_slice(b"\"2021\";\"02\";\"0300\";\"160\";\"S\xe3\";\"4118501\";\"5\";\"20\"\n");
    latin1.extend_from_slice(b"\"2021\";\"02\";\"0100\";\"076\";\"PR\";\"9999999\";\"5\";\"99\"\n");
    fs::write(raw.join("a_2021.csv"), latin1)?;

    // Already-normalized table.
    fs::write(
        raw.join("b_2020.csv"),
        "CO_ANO,CO_MES,SH4,CO_PAIS,SG_UF_MUN,CO_MUN,KG_LIQUIDO,VL_FOB\n\
         2020,1,200,76,PR,4118501,1,70\n\
         2020,2,100,160,PR,4118501,1,40\n\
         2020,3,100,160,PR,4118501,1,30\n",
    )?;

    // Neither shape: skipped, not fatal.
    fs::write(raw.join("c_notes.csv"), "nothing to see\n")?;
    write_dictionaries(dir.path())?;

    let cfg = PipelineConfig {
        sort_mode: SortMode::PerYear,
        chronological: true,
        ..config(dir.path())
    };
    let summary = run_pipeline(&cfg, &SilentObserver)?;

    assert_eq!(summary.merge.files_found, 3);
    assert_eq!(summary.merge.files_skipped, 1);
    assert_eq!(summary.merge.records_matched, 5);
    assert_eq!(summary.sort.years, vec![2020, 2021]);
    assert!(summary.alternate_sort.is_none());

    let merged = Table::read(&cfg.merged_path)?;
    let years: Vec<&str> = merged.rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(years, vec!["2020", "2020", "2020", "2021", "2021"]);

    let sorted = Table::read(&cfg.sorted_path)?;
    assert_eq!(sorted.headers[8..], ["FREQ_SH4_ANO", "FREQ_PAIS_ANO"]);

    let out = Table::read(&cfg.translated_path)?;
    assert_eq!(out.len(), 5);
    let sh4 = out.column_index("NO_SH4_POR").expect("label column");
    let pais = out.column_index("NO_PAIS").expect("label column");
    let labels: Vec<(&str, &str)> = out
        .rows
        .iter()
        .map(|r| (r[sh4].as_str(), r[pais].as_str()))
        .collect();
    assert_eq!(
        labels,
        vec![
            ("Cavalos", "China"),
            ("Cavalos", "China"),
            ("Soja", "Brasil"),
            ("Milho", "China"),
            ("Milho", "China"),
        ]
    );
    assert_eq!(summary.translation.commodity.unmatched, 0);
    assert_eq!(summary.translation.country.unmatched, 0);
    Ok(())
}

#[test]
fn unknown_municipality_stops_the_run() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    let raw = dir.path().join("raw");
    fs::create_dir_all(&raw)?;
    fs::write(
        raw.join("a.csv"),
        format!("{RAW_HEADER}\"2020\";\"01\";\"0100\";\"076\";\"PR\";\"1\";\"1\";\"1\"\n"),
    )?;
    write_dictionaries(dir.path())?;

    let cfg = config(dir.path());
    let err = run_pipeline(&cfg, &SilentObserver).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoMatchingRecords { municipality: 4118501 })
    ));
    assert!(!cfg.merged_path.exists());
    assert!(!cfg.translated_path.exists());
    Ok(())
}

#[test]
fn empty_input_directory_is_an_error() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    fs::create_dir_all(dir.path().join("raw"))?;
    let err = run_pipeline(&config(dir.path()), &SilentObserver).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoSourceFiles { .. })
    ));
    Ok(())
}
