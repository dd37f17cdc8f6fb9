//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments
//! - dispatches to fetch / composite / detect
//! - prints reports and writes optional exports

use std::time::Duration;

use chrono::Local;
use clap::Parser;
use tracing::info;

use crate::app::pipeline::DetectRunConfig;
use crate::cli::{Command, CompositeArgs, DetectArgs, FetchArgs};
use crate::data::FetchOptions;
use crate::detect::DetectConfig;
use crate::error::AppError;
use crate::io::ingest::SeriesColumns;

pub mod pipeline;

/// Entry point for the `etfmad` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` values feed clap's `env = ...` fallbacks, so load them before parsing.
    dotenvy::dotenv().ok();
    crate::logging::init_tracing();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Detect(args) => handle_detect(args),
        Command::Composite(args) => handle_composite(args),
        Command::Fetch(args) => handle_fetch(args),
    }
}

fn handle_detect(args: DetectArgs) -> Result<(), AppError> {
    let config = detect_config_from_args(&args);
    let run = pipeline::run_detect(&config)?;

    println!("{}", crate::report::format_report(&run.series, &run.result, &run.report));

    if let Some(path) = &args.export {
        crate::io::export::write_detection_csv(path, &run.series, &run.result)?;
        info!(path = %path.display(), "detection results exported");
    }
    Ok(())
}

fn handle_composite(args: CompositeArgs) -> Result<(), AppError> {
    let columns = SeriesColumns {
        date: args.date_column.clone(),
        amount: args.amount_column.clone(),
    };
    let composite = crate::io::composite::merge_daily_amounts(&args.inputs, &columns)?;
    if composite.observations.is_empty() {
        return Err(AppError::new(3, "No usable rows found in the input files."));
    }

    crate::io::composite::write_composite_csv(&args.output, &composite.observations)?;
    println!(
        "Composite series: {} day(s) written to {} ({} file(s) skipped, {} row(s) skipped)",
        composite.observations.len(),
        args.output.display(),
        composite.skipped_files.len(),
        composite.skipped_rows
    );
    Ok(())
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let options = fetch_options_from_args(&args)?;
    let today = Local::now().date_naive();
    let start = args.start.unwrap_or(today);
    let end = args.end.unwrap_or(today);

    std::fs::create_dir_all(&args.out_dir).map_err(|e| {
        AppError::new(2, format!("Failed to create output dir '{}': {e}", args.out_dir.display()))
    })?;

    let source = crate::data::source_for(args.exchange, &options)?;
    let summary = crate::data::fetch_range(source.as_ref(), &args.codes, start, end, &options, &args.out_dir)?;

    println!(
        "{} fetch done: {} fetched, {} without data, {} failed",
        args.exchange.display_name(),
        summary.fetched,
        summary.empty,
        summary.failed
    );
    Ok(())
}

pub fn detect_config_from_args(args: &DetectArgs) -> DetectRunConfig {
    DetectRunConfig {
        history_path: args.history.clone(),
        new_data_path: args.new_data.clone(),
        columns: SeriesColumns {
            date: args.date_column.clone(),
            amount: args.amount_column.clone(),
        },
        detect: DetectConfig::new(args.window, args.threshold),
        parallel: args.parallel,
    }
}

pub fn fetch_options_from_args(args: &FetchArgs) -> Result<FetchOptions, AppError> {
    let delay = Duration::try_from_secs_f64(args.delay_secs)
        .map_err(|_| AppError::new(2, format!("Invalid --delay-secs value: {}", args.delay_secs)))?;
    Ok(FetchOptions {
        max_retries: args.retries,
        delay,
        include_weekends: args.include_weekends,
        ..FetchOptions::default()
    })
}
