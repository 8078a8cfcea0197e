//! Command-line entry point for the panel cleaning pipeline.

use clap::Parser;
use polars::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use eupanel::{Pipeline, PipelineConfig, Result};

#[derive(Parser, Debug)]
#[command(
    name = "eupanel",
    about = "Clean and impute a European country-year indicator panel",
    version
)]
struct Args {
    /// Input CSV with country, year, and indicator columns.
    input: PathBuf,

    /// Directory for the workbook and plots.
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// File name of the exported workbook.
    #[arg(long, default_value = "eu_cleaned.xlsx")]
    workbook: String,

    /// First year kept (inclusive).
    #[arg(long, default_value_t = 1980)]
    year_min: i32,

    /// Last year kept (inclusive).
    #[arg(long, default_value_t = 2018)]
    year_max: i32,

    /// Minimum absolute correlation for imputation covariates.
    #[arg(long, default_value_t = 0.5)]
    correlation_threshold: f64,

    /// Seed for the regressor.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Skip rendering the diagnostic plots.
    #[arg(long)]
    no_plots: bool,

    /// Log filter, e.g. "debug" or "eupanel=trace".
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Suppress the run summary on stdout.
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_csv(path: &PathBuf) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.clone()))?
        .finish()?;
    Ok(df)
}

fn run(args: Args) -> Result<()> {
    let config = PipelineConfig::builder()
        .year_range(args.year_min, args.year_max)
        .correlation_threshold(args.correlation_threshold)
        .seed(args.seed)
        .output_dir(args.output_dir)
        .workbook_name(args.workbook)
        .generate_plots(!args.no_plots)
        .build()
        .map_err(|e| eupanel::PanelError::InvalidConfig(e.to_string()))?;

    let df = load_csv(&args.input)?;
    let result = Pipeline::new(config)?.run(df)?;

    if !args.quiet {
        let s = &result.summary;
        println!("Panel cleaning complete in {} ms", s.duration_ms);
        println!(
            "  rows      {} -> {}",
            s.rows_before, s.rows_after
        );
        println!(
            "  columns   {} -> {}",
            s.columns_before, s.columns_after
        );
        println!(
            "  countries {} -> {}",
            s.countries_before, s.countries_after
        );
        for step in &s.steps {
            println!("  - {step}");
        }
        if s.remaining_missing() > 0 {
            println!("  {} missing values could not be imputed", s.remaining_missing());
        }
        for path in &result.outputs {
            println!("  wrote {}", path.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
