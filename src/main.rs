use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use tradeflow::{
    config::PipelineConfig,
    merge::{discover_sources, run_filter_stage},
    parse::parse_file,
    pipeline::run_pipeline,
    rank::{run_sort_stage, SortMode},
    translate::{run_translate_stage, TranslateInputs},
    TracingObserver,
};

#[derive(Parser)]
#[command(author, version, about = "Municipal foreign-trade records: filter, rank and translate")]
struct Cli {
    /// YAML config; every key is optional.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging for this crate (RUST_LOG still wins).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Keep one municipality's records from every raw export and merge them.
    Filter {
        #[arg(long)]
        input_dir: Option<PathBuf>,
        #[arg(long)]
        pattern: Option<String>,
        #[arg(short, long)]
        municipality: Option<i64>,
        /// Order the merged rows by year and month.
        #[arg(long)]
        chronological: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rank the merged dataset by code frequency.
    Sort {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        mode: Option<SortMode>,
    },
    /// Attach commodity and country labels to the sorted dataset.
    Translate {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long)]
        sh4_dictionary: Option<PathBuf>,
        #[arg(long)]
        country_dictionary: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run filter, sort and translate in sequence.
    Run {
        /// Write a JSON summary of the run here.
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Report the detected shape and parse counts of raw files.
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let fallback = if cli.verbose {
        "info,tradeflow=debug"
    } else {
        "info,tradeflow=info"
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) config ───────────────────────────────────────────────────
    let mut cfg = PipelineConfig::load_or_default(cli.config.as_deref())?;
    let observer = TracingObserver;

    match cli.command {
        Command::Filter {
            input_dir,
            pattern,
            municipality,
            chronological,
            output,
        } => {
            cfg.input_dir = input_dir.unwrap_or(cfg.input_dir);
            cfg.pattern = pattern.unwrap_or(cfg.pattern);
            cfg.municipality = municipality.unwrap_or(cfg.municipality);
            cfg.chronological |= chronological;
            cfg.merged_path = output.unwrap_or(cfg.merged_path);

            let sources = discover_sources(&cfg.input_dir, &cfg.pattern)?;
            run_filter_stage(
                &sources,
                cfg.municipality,
                cfg.chronological,
                &cfg.merged_path,
                &observer,
            )?;
        }
        Command::Sort { input, output, mode } => {
            let input = input.unwrap_or(cfg.merged_path);
            let output = output.unwrap_or(cfg.sorted_path);
            run_sort_stage(&input, &output, mode.unwrap_or(cfg.sort_mode), &observer)?;
        }
        Command::Translate {
            input,
            sh4_dictionary,
            country_dictionary,
            output,
        } => {
            let dataset = input.unwrap_or(cfg.sorted_path);
            let commodity_dictionary = sh4_dictionary.unwrap_or(cfg.commodity_dictionary);
            let country_dictionary = country_dictionary.unwrap_or(cfg.country_dictionary);
            let output = output.unwrap_or(cfg.translated_path);
            let inputs = TranslateInputs {
                dataset: &dataset,
                commodity_dictionary: &commodity_dictionary,
                country_dictionary: &country_dictionary,
            };
            run_translate_stage(&inputs, &output, cfg.missing_sample, &observer)?;
        }
        Command::Run { summary } => {
            let result = run_pipeline(&cfg, &observer)?;
            if let Some(path) = summary {
                result.write_json(&path)?;
                info!("summary → {}", path.display());
            }
        }
        Command::Inspect { files } => inspect(&files),
    }

    info!("done");
    Ok(())
}

fn inspect(files: &[PathBuf]) {
    for path in files {
        println!("── {}", path.display());
        match parse_file(path) {
            Ok((shape, parsed)) => {
                let s = &parsed.stats;
                println!("   shape:             {}", shape);
                println!("   data lines:        {}", s.data_lines);
                println!("   accepted:          {}", s.accepted);
                println!("   skipped lines:     {}", s.skipped_lines);
                println!("   coercion failures: {}", s.coercion_failures);
            }
            Err(e) => println!("   ✗ {:#}", e),
        }
    }
}
